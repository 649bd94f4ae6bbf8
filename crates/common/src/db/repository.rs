//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A finished search answer ready to be stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQueryRecord {
    pub query: String,
    pub brief: String,
    pub response: String,
    pub references: Vec<String>,
    pub expanded_query: String,
    pub model: String,
    pub backend_version: Option<String>,
    pub client_id: Option<Uuid>,
    pub user_id: Option<String>,
    /// Seconds spent producing the answer
    pub response_time: f64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Store a search answer
    pub async fn save_query(&self, record: NewQueryRecord) -> Result<QueryIr> {
        let query = QueryIrActiveModel {
            id: Set(Uuid::new_v4()),
            query: Set(record.query),
            brief: Set(record.brief),
            response: Set(record.response),
            references: Set(serde_json::to_value(record.references)?),
            expanded_query: Set(record.expanded_query),
            model: Set(record.model),
            backend_version: Set(record.backend_version),
            client_id: Set(record.client_id),
            user_id: Set(record.user_id),
            timestamp: Set(Utc::now().into()),
            response_time: Set(record.response_time),
        };

        query.insert(self.conn()).await.map_err(Into::into)
    }

    /// Find a stored answer by ID
    pub async fn find_query(&self, id: Uuid) -> Result<Option<QueryIr>> {
        QueryIrEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Stored answers with `start <= timestamp <= end`, oldest first
    pub async fn list_queries_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<QueryIr>> {
        QueryIrEntity::find()
            .filter(QueryIrColumn::Timestamp.gte(start))
            .filter(QueryIrColumn::Timestamp.lte(end))
            .order_by_asc(QueryIrColumn::Timestamp)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Feedback Operations
    // ========================================================================

    /// Create or replace the feedback for a stored answer.
    ///
    /// Fails with `QueryNotFound` when the answer does not exist.
    pub async fn upsert_feedback(
        &self,
        query_id: Uuid,
        rating: bool,
        comment: Option<String>,
    ) -> Result<Feedback> {
        let txn = self.conn().begin().await?;

        if QueryIrEntity::find_by_id(query_id).one(&txn).await?.is_none() {
            return Err(AppError::QueryNotFound {
                id: query_id.to_string(),
            });
        }

        let saved = match FeedbackEntity::find_by_id(query_id).one(&txn).await? {
            Some(existing) => {
                let mut feedback: FeedbackActiveModel = existing.into();
                feedback.rating = Set(rating);
                feedback.comment = Set(comment);
                feedback.update(&txn).await?
            }
            None => {
                FeedbackActiveModel {
                    query_id: Set(query_id),
                    rating: Set(rating),
                    comment: Set(comment),
                }
                .insert(&txn)
                .await?
            }
        };

        txn.commit().await?;
        Ok(saved)
    }

    /// Find the feedback attached to a stored answer
    pub async fn find_feedback(&self, query_id: Uuid) -> Result<Option<Feedback>> {
        FeedbackEntity::find_by_id(query_id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Search Feedback Operations
    // ========================================================================

    /// Store a free-form search quality report
    pub async fn save_search_feedback(
        &self,
        question: String,
        additional: Option<String>,
        client_id: Option<Uuid>,
    ) -> Result<SearchFeedback> {
        let feedback = SearchFeedbackActiveModel {
            id: Set(Uuid::new_v4()),
            question: Set(question),
            additional: Set(additional),
            client_id: Set(client_id),
            timestamp: Set(Utc::now().into()),
        };

        feedback.insert(self.conn()).await.map_err(Into::into)
    }

    /// Search quality reports with `start <= timestamp <= end`, oldest first
    pub async fn list_search_feedback_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SearchFeedback>> {
        SearchFeedbackEntity::find()
            .filter(SearchFeedbackColumn::Timestamp.gte(start))
            .filter(SearchFeedbackColumn::Timestamp.lte(end))
            .order_by_asc(SearchFeedbackColumn::Timestamp)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}
