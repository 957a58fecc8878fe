use serde::Serialize;

use crate::domain::{
    CurrentUser, PublicTest, PublicTestLookup, TestAttemptSummary, TestCatalog, UserProvider,
};

pub const NOT_FOUND_TITLE: &str = "Test Not Found";
pub const NOT_FOUND_DESCRIPTION: &str = "The requested test could not be found";
pub const DEFAULT_DESCRIPTION: &str = "Take this assessment test";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpenGraph {
    pub title: String,
    pub description: String,
}

// Title/description pair used for the page head and link previews.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_graph: Option<OpenGraph>,
}

impl PageMetadata {
    pub fn not_found() -> Self {
        Self {
            title: NOT_FOUND_TITLE.to_string(),
            description: NOT_FOUND_DESCRIPTION.to_string(),
            open_graph: None,
        }
    }

    pub fn for_test(test: &PublicTest) -> Self {
        // Only an absent or empty description falls back.
        let description = test
            .description
            .as_deref()
            .filter(|description| !description.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();

        Self {
            title: test.title.clone(),
            description: description.clone(),
            open_graph: Some(OpenGraph {
                title: test.title.clone(),
                description,
            }),
        }
    }
}

// Everything the test details view needs.
#[derive(Clone, Debug, PartialEq)]
pub struct TestPage {
    pub test: PublicTest,
    pub attempts: Vec<TestAttemptSummary>,
    pub is_authenticated: bool,
    pub metadata: PageMetadata,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PageError {
    NotFound,
}

// Public test page use case with injected collaborators.
pub struct TestPageUseCase<U, C> {
    pub users: U,
    pub catalog: C,
}

impl<U, C> TestPageUseCase<U, C>
where
    U: UserProvider,
    C: TestCatalog,
{
    pub async fn metadata(&self, slug: &str) -> PageMetadata {
        match self.catalog.get_public_test(slug, None).await {
            Ok(PublicTestLookup {
                test: Some(test), ..
            }) => PageMetadata::for_test(&test),
            Ok(_) => PageMetadata::not_found(),
            Err(err) => {
                tracing::error!(error = %err, slug, "error fetching test metadata");
                PageMetadata::not_found()
            }
        }
    }

    // Resolves the viewer, then fetches the test. Any fetch failure collapses into
    // NotFound so no internal detail reaches the page.
    pub async fn render(&self, slug: &str, token: Option<&str>) -> Result<TestPage, PageError> {
        let viewer = self.resolve_viewer(token).await;
        let is_authenticated = viewer.is_some();

        let lookup = self
            .catalog
            .get_public_test(slug, viewer.as_ref())
            .await
            .map_err(|err| {
                tracing::error!(error = %err, slug, "error fetching test");
                PageError::NotFound
            })?;

        let Some(test) = lookup.test else {
            tracing::debug!(slug, "no public test for slug");
            return Err(PageError::NotFound);
        };

        let metadata = PageMetadata::for_test(&test);
        Ok(TestPage {
            test,
            attempts: lookup.attempts,
            is_authenticated,
            metadata,
        })
    }

    async fn resolve_viewer(&self, token: Option<&str>) -> Option<CurrentUser> {
        // No credentials means the lookup is skipped entirely.
        let token = token.map(str::trim).filter(|token| !token.is_empty())?;

        match self.users.current_user(token).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "current user lookup failed; rendering as guest");
                None
            }
        }
    }
}
