//! The gist-backed state store.
//!
//! ghtt keeps its whole state in one private gist per account. The gist is
//! found by its description tag, and the [`GistDocument`] lives in a single
//! well-known file inside it. The document also records the id of its own
//! gist; [`GistStore::read`] checks that self-reference on every read and
//! repairs it when it drifted.
//!
//! Reads heal themselves: a missing gist is created, and a gist whose file
//! is missing or unparseable is reset to an empty document in place.
//! Failures that say nothing about the remote content (network errors,
//! server errors, rate limiting, an interrupted gist listing) are returned
//! instead, so a transient outage never overwrites remote state.

use std::collections::BTreeMap;

use ghtt_protocol::GistDocument;
use tracing::{debug, info, instrument, warn};

use crate::client::GitHubClient;
use crate::error::{Error, Result};
use crate::models::{FileContent, Gist, GistFile, GistPayload};
use crate::pagination::ListOutcome;
use crate::transport::Transport;

/// Default description tag of the state gist.
pub const DEFAULT_DESCRIPTION: &str = "GHTT-state";

/// Default name of the file holding the state document.
pub const DEFAULT_FILENAME: &str = "GHTT-state";

/// Which path [`GistStore::read`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAction {
    /// The client has no token; nothing was fetched.
    Unauthenticated,
    /// The document was read as stored.
    Loaded,
    /// No tagged gist existed, so one was created.
    Created,
    /// The document's id did not match its gist and was rewritten.
    Repaired,
    /// The gist's file was missing or unparseable and was reset.
    Healed,
}

/// The result of [`GistStore::read`].
#[derive(Debug)]
pub struct ReadOutcome {
    /// The document, with its id matching the containing gist.
    pub document: GistDocument,
    /// The containing gist, if one exists.
    pub gist_id: Option<String>,
    /// Which path the read took.
    pub action: ReadAction,
    /// Failure of the repair or heal write, if one was attempted and failed.
    pub write_error: Option<Error>,
}

impl ReadOutcome {
    fn new(document: GistDocument, action: ReadAction) -> Self {
        let gist_id = document.has_id().then(|| document.id.clone());
        Self {
            document,
            gist_id,
            action,
            write_error: None,
        }
    }
}

/// Locates and persists the state document.
///
/// # Examples
///
/// ```
/// use ghtt_github::GistStore;
///
/// let store = GistStore::default().with_environment("staging");
/// assert_eq!(store.description(), "GHTT-state-staging");
/// assert_eq!(store.filename(), "GHTT-state");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GistStore {
    description: String,
    filename: String,
}

impl Default for GistStore {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTION, DEFAULT_FILENAME)
    }
}

impl GistStore {
    /// Creates a store for the gist tagged `description`, keeping the
    /// document in `filename`.
    #[must_use]
    pub fn new(description: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            filename: filename.into(),
        }
    }

    /// Suffixes the description tag with a deployment environment, so that
    /// environments sharing an account keep separate documents.
    #[must_use]
    pub fn with_environment(mut self, environment: &str) -> Self {
        if !environment.is_empty() {
            self.description = format!("{}-{environment}", self.description);
        }
        self
    }

    /// Returns the description tag.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the document filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Reads the state document, creating or repairing it as needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the gist listing is incomplete and did not
    /// contain the tag, when creating the gist fails, or when fetching the
    /// document fails for a reason other than missing or invalid content.
    #[instrument(skip_all, fields(description = %self.description))]
    pub async fn read<T: Transport>(&self, client: &GitHubClient<T>) -> Result<ReadOutcome> {
        if !client.is_authenticated() {
            debug!("no token, using empty document");
            return Ok(ReadOutcome::new(
                GistDocument::default(),
                ReadAction::Unauthenticated,
            ));
        }

        let ListOutcome {
            items, pages, error, ..
        } = client.fetch_gists().await;
        let found = items
            .into_iter()
            .find(|gist| gist.description.as_deref() == Some(self.description.as_str()));

        let gist = match (found, error) {
            (Some(gist), _) => gist,
            (None, None) => return self.create(client).await,
            (None, Some(source)) => {
                return Err(Error::IncompleteListing {
                    resource: "gists",
                    pages,
                    source: Box::new(source),
                });
            }
        };

        match self.load(client, &gist).await {
            Ok(document) if document.id == gist.id => {
                debug!(gist = %gist.id, issues = document.issues.len(), "loaded document");
                Ok(ReadOutcome::new(document, ReadAction::Loaded))
            }
            Ok(mut document) => {
                warn!(
                    gist = %gist.id,
                    stored = %document.id,
                    "document id does not match its gist, repairing"
                );
                document.id = gist.id;
                let write_error = self.write(client, &mut document).await.err();
                Ok(ReadOutcome {
                    write_error,
                    ..ReadOutcome::new(document, ReadAction::Repaired)
                })
            }
            Err(e) if e.is_resolution_failure() || e.is_parse_failure() => {
                warn!(gist = %gist.id, error = %e, "document unreadable, resetting it");
                let mut document = GistDocument {
                    id: gist.id,
                    ..GistDocument::default()
                };
                let write_error = self.write(client, &mut document).await.err();
                Ok(ReadOutcome {
                    write_error,
                    ..ReadOutcome::new(document, ReadAction::Healed)
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Reads the document of a known gist directly.
    ///
    /// Uses the inline content returned with the gist unless GitHub
    /// truncated it, in which case the raw file is fetched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GistNotFound`] if the gist no longer carries the
    /// description tag, and other errors if the gist or its file cannot be
    /// fetched or parsed.
    #[instrument(skip(self, client))]
    pub async fn read_by_id<T: Transport>(
        &self,
        client: &GitHubClient<T>,
        id: &str,
    ) -> Result<GistDocument> {
        let gist = client.get_gist(id).await?;
        if gist.description.as_deref() != Some(self.description.as_str()) {
            return Err(Error::GistNotFound {
                description: self.description.clone(),
            });
        }
        let file = self.resolve_file(&gist)?;
        match file.full_content() {
            Some(content) => Ok(GistDocument::from_json(content)?),
            None => self.load(client, &gist).await,
        }
    }

    /// Writes the document.
    ///
    /// A document without an id gets a new private gist, whose id is stored
    /// into the document before the content is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the gist cannot be created or updated.
    #[instrument(skip_all, fields(id = %document.id))]
    pub async fn write<T: Transport>(
        &self,
        client: &GitHubClient<T>,
        document: &mut GistDocument,
    ) -> Result<()> {
        if !document.has_id() {
            let id = client.create_gist(&self.payload(document)?).await?;
            info!(gist = %id, "created state gist");
            document.id = id;
        }
        client
            .update_gist(&document.id, &self.payload(document)?)
            .await
    }

    /// Builds the gist body holding `document`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn payload(&self, document: &GistDocument) -> Result<GistPayload> {
        let content = document.to_pretty_json()?;
        Ok(GistPayload {
            description: self.description.clone(),
            public: false,
            files: BTreeMap::from([(self.filename.clone(), FileContent { content })]),
        })
    }

    async fn create<T: Transport>(&self, client: &GitHubClient<T>) -> Result<ReadOutcome> {
        info!("no state gist found, creating one");
        let mut document = GistDocument::default();
        if let Err(e) = self.write(client, &mut document).await {
            if !document.has_id() {
                return Err(e);
            }
            warn!(error = %e, "created state gist but could not write its id");
            return Ok(ReadOutcome {
                write_error: Some(e),
                ..ReadOutcome::new(document, ReadAction::Created)
            });
        }
        Ok(ReadOutcome::new(document, ReadAction::Created))
    }

    async fn load<T: Transport>(
        &self,
        client: &GitHubClient<T>,
        gist: &Gist,
    ) -> Result<GistDocument> {
        let raw_url = self
            .resolve_file(gist)?
            .raw_url
            .as_deref()
            .ok_or_else(|| self.missing_file(gist))?;
        let content = client.fetch_raw(raw_url).await?;
        Ok(GistDocument::from_json(&content)?)
    }

    /// Picks the document file, preferring the well-known filename.
    fn resolve_file<'g>(&self, gist: &'g Gist) -> Result<&'g GistFile> {
        gist.files
            .get(&self.filename)
            .or_else(|| gist.files.values().next())
            .ok_or_else(|| self.missing_file(gist))
    }

    fn missing_file(&self, gist: &Gist) -> Error {
        Error::MissingFile {
            gist_id: gist.id.clone(),
            filename: self.filename.clone(),
        }
    }
}
