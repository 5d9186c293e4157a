//! Postgres backend
//!
//! Papers, authors, categories and citation edges live in relational
//! tables; chunk embeddings use pgvector. All statements are
//! parameterized and go through SeaORM's raw statement interface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    DbBackend, Statement, TransactionTrait,
};
use tracing::info;

use crate::config::StoreConfig;
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use crate::models::{Author, Category, ChunkRecord, CitationLink, CitationNeighborhood, Paper};
use crate::vector::{ChunkHit, VectorIndex};

use super::GraphStore;

/// Graph store and vector index over Postgres with pgvector
#[derive(Clone)]
pub struct PostgresStore {
    conn: DatabaseConnection,
    embedder: Arc<dyn Embedder>,
}

impl PostgresStore {
    /// Connect using pool settings from configuration
    pub async fn connect(config: &StoreConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        info!("Connecting to graph store...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts).await.map_err(|e| AppError::Store {
            message: format!("failed to connect: {e}"),
        })?;

        Ok(Self { conn, embedder })
    }

    /// Create tables and indexes if they do not exist.
    ///
    /// `dimension` fixes the width of the embedding column and must
    /// match the configured embedder.
    pub async fn ensure_schema(&self, dimension: usize) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE EXTENSION IF NOT EXISTS vector;

            CREATE TABLE IF NOT EXISTS papers (
                arxiv_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                published DATE NOT NULL,
                abs_link TEXT NOT NULL,
                pdf_link TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS authors (
                name TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS categories (
                code TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS paper_authors (
                arxiv_id TEXT NOT NULL REFERENCES papers(arxiv_id) ON DELETE CASCADE,
                name TEXT NOT NULL REFERENCES authors(name),
                PRIMARY KEY (arxiv_id, name)
            );

            CREATE TABLE IF NOT EXISTS paper_categories (
                arxiv_id TEXT NOT NULL REFERENCES papers(arxiv_id) ON DELETE CASCADE,
                code TEXT NOT NULL REFERENCES categories(code),
                PRIMARY KEY (arxiv_id, code)
            );

            CREATE TABLE IF NOT EXISTS paper_cited_raw (
                arxiv_id TEXT NOT NULL REFERENCES papers(arxiv_id) ON DELETE CASCADE,
                cited_id TEXT NOT NULL,
                pos INT NOT NULL,
                PRIMARY KEY (arxiv_id, cited_id)
            );

            CREATE TABLE IF NOT EXISTS citations (
                citing TEXT NOT NULL REFERENCES papers(arxiv_id) ON DELETE CASCADE,
                cited TEXT NOT NULL REFERENCES papers(arxiv_id) ON DELETE CASCADE,
                PRIMARY KEY (citing, cited)
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id BIGSERIAL PRIMARY KEY,
                arxiv_id TEXT NOT NULL,
                seq INT NOT NULL,
                content TEXT NOT NULL,
                embedding vector({dimension}),
                linked BOOLEAN NOT NULL DEFAULT FALSE
            );

            CREATE INDEX IF NOT EXISTS idx_citations_cited ON citations (cited);
            CREATE INDEX IF NOT EXISTS idx_paper_authors_name ON paper_authors (name);
            CREATE INDEX IF NOT EXISTS idx_chunks_arxiv_id ON chunks (arxiv_id);
            "#
        );
        self.conn.execute_unprepared(&ddl).await?;
        Ok(())
    }

    fn embedding_literal(embedding: &[f32]) -> String {
        // pgvector string format "[1.0,2.0,...]"
        format!(
            "[{}]",
            embedding
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    }

    async fn upsert_one(txn: &DatabaseTransaction, paper: &Paper) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO papers (arxiv_id, title, summary, published, abs_link, pdf_link)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (arxiv_id) DO NOTHING
            "#,
            vec![
                paper.arxiv_id.clone().into(),
                paper.title.clone().into(),
                paper.summary.clone().into(),
                paper.published.into(),
                paper.abs_link.clone().into(),
                paper.pdf_link.clone().into(),
            ],
        );
        txn.execute(stmt).await?;

        for name in &paper.authors {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO authors (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
                vec![name.clone().into()],
            );
            txn.execute(stmt).await?;

            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO paper_authors (arxiv_id, name) VALUES ($1, $2)
                ON CONFLICT (arxiv_id, name) DO NOTHING
                "#,
                vec![paper.arxiv_id.clone().into(), name.clone().into()],
            );
            txn.execute(stmt).await?;
        }

        for code in &paper.categories {
            // unseeded codes get a bare placeholder entry
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO categories (code, title, description) VALUES ($1, $1, '')
                ON CONFLICT (code) DO NOTHING
                "#,
                vec![code.clone().into()],
            );
            txn.execute(stmt).await?;

            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO paper_categories (arxiv_id, code) VALUES ($1, $2)
                ON CONFLICT (arxiv_id, code) DO NOTHING
                "#,
                vec![paper.arxiv_id.clone().into(), code.clone().into()],
            );
            txn.execute(stmt).await?;
        }

        for (pos, cited) in paper.cited_arxiv_ids.iter().enumerate() {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO paper_cited_raw (arxiv_id, cited_id, pos) VALUES ($1, $2, $3)
                ON CONFLICT (arxiv_id, cited_id) DO NOTHING
                "#,
                vec![
                    paper.arxiv_id.clone().into(),
                    cited.clone().into(),
                    (pos as i32).into(),
                ],
            );
            txn.execute(stmt).await?;
        }

        Ok(())
    }

    /// Load one paper with its links and citation count
    async fn load_paper(&self, arxiv_id: &str) -> Result<Option<Paper>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                p.arxiv_id, p.title, p.summary, p.published, p.abs_link, p.pdf_link,
                (SELECT COUNT(*) FROM citations c WHERE c.cited = p.arxiv_id) AS citation_count
            FROM papers p
            WHERE p.arxiv_id = $1
            "#,
            vec![arxiv_id.into()],
        );
        let row = match self.conn.query_one(stmt).await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut paper = Paper {
            arxiv_id: row.try_get_by_index::<String>(0)?,
            title: row.try_get_by_index::<String>(1)?,
            summary: row.try_get_by_index::<String>(2)?,
            authors: Vec::new(),
            categories: Vec::new(),
            published: row.try_get_by_index::<NaiveDate>(3)?,
            abs_link: row.try_get_by_index::<String>(4)?,
            pdf_link: row.try_get_by_index::<String>(5)?,
            full_text: String::new(),
            cited_arxiv_ids: Vec::new(),
            citation_count: Some(row.try_get_by_index::<i64>(6)? as u64),
        };

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT name FROM paper_authors WHERE arxiv_id = $1 ORDER BY name",
            vec![arxiv_id.into()],
        );
        for row in self.conn.query_all(stmt).await? {
            paper.authors.push(row.try_get_by_index::<String>(0)?);
        }

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT code FROM paper_categories WHERE arxiv_id = $1 ORDER BY code",
            vec![arxiv_id.into()],
        );
        for row in self.conn.query_all(stmt).await? {
            paper.categories.push(row.try_get_by_index::<String>(0)?);
        }

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT cited_id FROM paper_cited_raw WHERE arxiv_id = $1 ORDER BY pos",
            vec![arxiv_id.into()],
        );
        for row in self.conn.query_all(stmt).await? {
            paper.cited_arxiv_ids.push(row.try_get_by_index::<String>(0)?);
        }

        Ok(Some(paper))
    }

    async fn load_papers_ordered(&self, ids: &[String]) -> Result<Vec<Paper>> {
        let mut papers = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(paper) = self.load_paper(id).await? {
                papers.push(paper);
            }
        }
        Ok(papers)
    }
}

#[async_trait]
impl GraphStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::Store {
                message: format!("ping failed: {e}"),
            })?;
        Ok(())
    }

    async fn seed_categories(&self, categories: &[Category]) -> Result<()> {
        let txn = self.conn.begin().await?;
        for c in categories {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO categories (code, title, description) VALUES ($1, $2, $3)
                ON CONFLICT (code) DO NOTHING
                "#,
                vec![
                    c.code.clone().into(),
                    c.title.clone().into(),
                    c.description.clone().into(),
                ],
            );
            txn.execute(stmt).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn upsert_papers(&self, papers: &[Paper]) -> Result<()> {
        let txn = self.conn.begin().await?;
        for paper in papers {
            Self::upsert_one(&txn, paper).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn materialize_citations(&self, arxiv_id: &str) -> Result<u64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO citations (citing, cited)
            SELECT r.arxiv_id, r.cited_id
            FROM paper_cited_raw r
            JOIN papers p ON p.arxiv_id = r.cited_id
            WHERE r.arxiv_id = $1 AND r.cited_id <> r.arxiv_id
            ON CONFLICT (citing, cited) DO NOTHING
            "#,
            vec![arxiv_id.into()],
        );
        self.conn.execute(stmt).await?;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT COUNT(*) FROM citations WHERE citing = $1",
            vec![arxiv_id.into()],
        );
        let count = match self.conn.query_one(stmt).await? {
            Some(row) => row.try_get_by_index::<i64>(0)? as u64,
            None => 0,
        };
        Ok(count)
    }

    async fn get_papers(&self, ids: &[String]) -> Result<Vec<Paper>> {
        self.load_papers_ordered(ids).await
    }

    async fn citing_papers(&self, arxiv_id: &str) -> Result<Vec<Paper>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT c.citing,
                   (SELECT COUNT(*) FROM citations c2 WHERE c2.cited = c.citing) AS cc
            FROM citations c
            WHERE c.cited = $1
            ORDER BY cc DESC, c.citing
            "#,
            vec![arxiv_id.into()],
        );
        let mut ids = Vec::new();
        for row in self.conn.query_all(stmt).await? {
            ids.push(row.try_get_by_index::<String>(0)?);
        }
        self.load_papers_ordered(&ids).await
    }

    async fn top_authors(&self, arxiv_id: &str) -> Result<Vec<Author>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT pa.name,
                   (SELECT COUNT(*) FROM paper_authors pa2 WHERE pa2.name = pa.name) AS cnt
            FROM paper_authors pa
            WHERE pa.arxiv_id = $1
            ORDER BY cnt DESC, pa.name
            "#,
            vec![arxiv_id.into()],
        );
        let mut authors = Vec::new();
        for row in self.conn.query_all(stmt).await? {
            authors.push(Author {
                name: row.try_get_by_index::<String>(0)?,
                paper_count: row.try_get_by_index::<i64>(1)? as u64,
            });
        }
        Ok(authors)
    }

    async fn cited_by_neighborhood(&self, arxiv_id: &str) -> Result<CitationNeighborhood> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT citing FROM citations WHERE cited = $1 ORDER BY citing",
            vec![arxiv_id.into()],
        );
        let mut first_ids = Vec::new();
        for row in self.conn.query_all(stmt).await? {
            first_ids.push(row.try_get_by_index::<String>(0)?);
        }

        // citers of citers, excluding the target and the first order
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT DISTINCT c2.citing
            FROM citations c1
            JOIN citations c2 ON c2.cited = c1.citing
            WHERE c1.cited = $1
              AND c2.citing <> $1
              AND c2.citing NOT IN (SELECT citing FROM citations WHERE cited = $1)
            ORDER BY c2.citing
            "#,
            vec![arxiv_id.into()],
        );
        let mut second_ids = Vec::new();
        for row in self.conn.query_all(stmt).await? {
            second_ids.push(row.try_get_by_index::<String>(0)?);
        }

        Ok(CitationNeighborhood {
            first_order: self.load_papers_ordered(&first_ids).await?,
            second_order: self.load_papers_ordered(&second_ids).await?,
        })
    }

    async fn induced_subgraph(&self, ids: &[String]) -> Result<Vec<CitationLink>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (1..=ids.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT citing, cited FROM citations \
             WHERE citing IN ({placeholders}) AND cited IN ({placeholders}) \
             ORDER BY citing, cited"
        );
        let values: Vec<sea_orm::Value> = ids.iter().map(|id| id.clone().into()).collect();
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);

        let mut edges = Vec::new();
        for row in self.conn.query_all(stmt).await? {
            edges.push(CitationLink {
                citing: row.try_get_by_index::<String>(0)?,
                cited: row.try_get_by_index::<String>(1)?,
            });
        }
        Ok(edges)
    }

    async fn link_chunks(&self) -> Result<u64> {
        let result = self
            .conn
            .execute_unprepared(
                r#"
                UPDATE chunks SET linked = TRUE
                WHERE linked = FALSE
                  AND EXISTS (SELECT 1 FROM papers p WHERE p.arxiv_id = chunks.arxiv_id)
                "#,
            )
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_orphan_chunks(&self) -> Result<u64> {
        let result = self
            .conn
            .execute_unprepared(
                r#"
                DELETE FROM chunks
                WHERE NOT EXISTS (SELECT 1 FROM papers p WHERE p.arxiv_id = chunks.arxiv_id)
                "#,
            )
            .await?;
        Ok(result.rows_affected())
    }

    async fn chunk_count(&self) -> Result<u64> {
        let stmt = Statement::from_string(DbBackend::Postgres, "SELECT COUNT(*) FROM chunks");
        let count = match self.conn.query_one(stmt).await? {
            Some(row) => row.try_get_by_index::<i64>(0)? as u64,
            None => 0,
        };
        Ok(count)
    }
}

#[async_trait]
impl VectorIndex for PostgresStore {
    async fn index(&self, chunks: &[ChunkRecord], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Store {
                message: format!(
                    "chunk/embedding length mismatch: {} vs {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        let txn = self.conn.begin().await?;
        for (record, embedding) in chunks.iter().zip(embeddings.iter()) {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO chunks (arxiv_id, seq, content, embedding)
                VALUES ($1, $2, $3, $4::vector)
                "#,
                vec![
                    record.arxiv_id.clone().into(),
                    (record.seq as i32).into(),
                    record.text.clone().into(),
                    Self::embedding_literal(embedding).into(),
                ],
            );
            txn.execute(stmt).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ChunkHit>> {
        let query_vec = self.embedder.embed(query).await?;
        let literal = Self::embedding_literal(&query_vec);

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT arxiv_id, content, 1 - (embedding <=> $1::vector) AS score
            FROM chunks
            WHERE embedding IS NOT NULL
            ORDER BY embedding <=> $1::vector
            LIMIT $2
            "#,
            vec![literal.into(), (k as i64).into()],
        );

        let mut hits = Vec::new();
        for row in self.conn.query_all(stmt).await? {
            hits.push(ChunkHit {
                arxiv_id: row.try_get_by_index::<String>(0)?,
                text: row.try_get_by_index::<String>(1)?,
                score: row.try_get_by_index::<f64>(2)? as f32,
            });
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_literal_format() {
        let lit = PostgresStore::embedding_literal(&[1.0, -0.5, 0.25]);
        assert_eq!(lit, "[1,-0.5,0.25]");
    }

    #[test]
    fn test_embedding_literal_empty() {
        assert_eq!(PostgresStore::embedding_literal(&[]), "[]");
    }
}
