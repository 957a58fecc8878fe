use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::{
    AttemptStatus, CatalogError, CurrentUser, PublicTest, PublicTestLookup, TestAttemptSummary,
    TestCatalog,
};

// Seed file layout: `[[tests]]` and `[[attempts]]` tables.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub tests: Vec<SeedTest>,
    #[serde(default)]
    pub attempts: Vec<SeedAttempt>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeedTest {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub question_count: u32,
    pub duration_minutes: Option<u32>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeedAttempt {
    pub id: String,
    pub test_id: String,
    pub user_id: u64,
    pub status: AttemptStatus,
    pub started_at: u64,
    pub completed_at: Option<u64>,
    pub percentage_score: Option<f64>,
}

// Catalog served from a TOML seed file, used when no database is configured.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTestCatalog {
    tests: HashMap<String, SeedTest>,
    attempts: Vec<SeedAttempt>,
}

impl InMemoryTestCatalog {
    pub fn from_seed(seed: CatalogSeed) -> Result<Self, CatalogError> {
        let mut tests = HashMap::new();
        for test in seed.tests {
            if test.slug.trim().is_empty() {
                return Err(CatalogError::InvalidRecord(format!(
                    "test {} has an empty slug",
                    test.id
                )));
            }
            if let Some(previous) = tests.insert(test.slug.clone(), test) {
                return Err(CatalogError::InvalidRecord(format!(
                    "duplicate slug {}",
                    previous.slug
                )));
            }
        }

        Ok(Self {
            tests,
            attempts: seed.attempts,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let seed: CatalogSeed =
            toml::from_str(raw).map_err(|err| CatalogError::InvalidRecord(err.to_string()))?;
        Self::from_seed(seed)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CatalogError::Unavailable(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

#[async_trait]
impl TestCatalog for InMemoryTestCatalog {
    async fn get_public_test(
        &self,
        slug: &str,
        viewer: Option<&CurrentUser>,
    ) -> Result<PublicTestLookup, CatalogError> {
        let Some(seed) = self.tests.get(slug).filter(|test| test.is_public) else {
            return Ok(PublicTestLookup::default());
        };

        let mut attempts: Vec<TestAttemptSummary> = match viewer {
            Some(user) => self
                .attempts
                .iter()
                .filter(|attempt| attempt.test_id == seed.id && attempt.user_id == user.user_id)
                .map(|attempt| TestAttemptSummary {
                    id: attempt.id.clone(),
                    status: attempt.status,
                    started_at: attempt.started_at,
                    completed_at: attempt.completed_at,
                    percentage_score: attempt.percentage_score,
                })
                .collect(),
            None => Vec::new(),
        };
        // Newest first.
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        Ok(PublicTestLookup {
            test: Some(PublicTest {
                id: seed.id.clone(),
                slug: seed.slug.clone(),
                title: seed.title.clone(),
                description: seed.description.clone(),
                question_count: seed.question_count,
                duration_minutes: seed.duration_minutes,
            }),
            attempts,
        })
    }
}

// PostgreSQL-backed catalog.
#[derive(Clone)]
pub struct PostgresTestCatalog {
    pub db: PgPool,
}

#[derive(sqlx::FromRow)]
struct TestRow {
    id: String,
    slug: String,
    title: String,
    description: Option<String>,
    question_count: i32,
    duration_minutes: Option<i32>,
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    id: String,
    status: String,
    started_at: i64,
    completed_at: Option<i64>,
    percentage_score: Option<f64>,
}

impl TestRow {
    fn into_domain(self) -> Result<PublicTest, CatalogError> {
        let question_count = u32::try_from(self.question_count).map_err(|_| {
            CatalogError::InvalidRecord(format!("test {} has a negative question count", self.id))
        })?;
        let duration_minutes = self
            .duration_minutes
            .map(u32::try_from)
            .transpose()
            .map_err(|_| {
                CatalogError::InvalidRecord(format!("test {} has a negative duration", self.id))
            })?;

        Ok(PublicTest {
            id: self.id,
            slug: self.slug,
            title: self.title,
            description: self.description,
            question_count,
            duration_minutes,
        })
    }
}

impl AttemptRow {
    fn into_domain(self) -> Result<TestAttemptSummary, CatalogError> {
        let status = parse_status(&self.status).ok_or_else(|| {
            CatalogError::InvalidRecord(format!("attempt {} has status {}", self.id, self.status))
        })?;
        let timestamp = |value: i64| {
            u64::try_from(value).map_err(|_| {
                CatalogError::InvalidRecord(format!("attempt {} has a negative timestamp", self.id))
            })
        };

        Ok(TestAttemptSummary {
            status,
            started_at: timestamp(self.started_at)?,
            completed_at: self.completed_at.map(timestamp).transpose()?,
            percentage_score: self.percentage_score,
            id: self.id.clone(),
        })
    }
}

fn parse_status(value: &str) -> Option<AttemptStatus> {
    match value {
        "IN_PROGRESS" => Some(AttemptStatus::InProgress),
        "COMPLETED" => Some(AttemptStatus::Completed),
        "ABANDONED" => Some(AttemptStatus::Abandoned),
        _ => None,
    }
}

impl PostgresTestCatalog {
    async fn attempts_for(
        &self,
        test_id: &str,
        user: &CurrentUser,
    ) -> Result<Vec<TestAttemptSummary>, CatalogError> {
        let Ok(user_id) = i64::try_from(user.user_id) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT id, status, started_at, completed_at, percentage_score
            FROM test_attempts
            WHERE test_id = $1 AND user_id = $2
            ORDER BY started_at DESC
            "#,
        )
        .bind(test_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|err| CatalogError::Unavailable(err.to_string()))?;

        rows.into_iter().map(AttemptRow::into_domain).collect()
    }
}

#[async_trait]
impl TestCatalog for PostgresTestCatalog {
    async fn get_public_test(
        &self,
        slug: &str,
        viewer: Option<&CurrentUser>,
    ) -> Result<PublicTestLookup, CatalogError> {
        let row = sqlx::query_as::<_, TestRow>(
            r#"
            SELECT id, slug, title, description, question_count, duration_minutes
            FROM tests
            WHERE slug = $1 AND is_public
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await
        .map_err(|err| CatalogError::Unavailable(err.to_string()))?;

        let Some(row) = row else {
            return Ok(PublicTestLookup::default());
        };
        let test = row.into_domain()?;

        let attempts = match viewer {
            Some(user) => self.attempts_for(&test.id, user).await?,
            None => Vec::new(),
        };

        Ok(PublicTestLookup {
            test: Some(test),
            attempts,
        })
    }
}
