use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// One of the three source fetches failed; nothing was cached.
    #[error("failed to fetch {collection} records from the backend")]
    Fetch {
        collection: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// The entity collection whose fetch failed.
    pub fn collection(&self) -> &'static str {
        match self {
            Error::Fetch { collection, .. } => collection,
        }
    }
}
