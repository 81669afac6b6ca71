use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tasks::{JsonMap, TaskData, TaskPriority, TaskStatus, split_stored_extras};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::task, models::ids};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    #[ts(type = "Record<string, unknown>")]
    pub extras: JsonMap,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    fn from_model(model: task::Model) -> Self {
        let stored = split_stored_extras(model.extras);
        Self {
            id: model.uuid,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            // The column wins; the blob copy only covers rows written before
            // the column existed.
            due_date: model.due_date.or(stored.due_date),
            // Always written as a JSON string array.
            tags: serde_json::from_value(model.tags).unwrap_or_default(),
            extras: stored.custom,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// Canonical content of this task, the input shape for updates.
    pub fn to_data(&self) -> TaskData {
        TaskData {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            priority: self.priority.clone(),
            due_date: self.due_date,
            tags: self.tags.clone(),
            extras: self.extras.clone(),
        }
    }

    pub async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(owner_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };

        let records = task::Entity::find()
            .filter(task::Column::UserId.eq(owner_id))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_uuid_for_user<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = Self::model_for_user(db, task_id, user_id).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        data: &TaskData,
        task_id: Uuid,
    ) -> Result<Self, DbErr> {
        let owner_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("User {user_id} not found")))?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            user_id: Set(owner_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(data.status.clone()),
            priority: Set(data.priority.clone()),
            due_date: Set(data.due_date),
            tags: Set(tags_value(&data.tags)?),
            extras: Set(Value::Object(data.extras.clone())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Replaces the row's content wholesale. Rewriting `extras` here is what
    /// scrubs reserved keys out of legacy blobs on their first update.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        user_id: Uuid,
        data: &TaskData,
    ) -> Result<Option<Self>, DbErr> {
        let Some(existing) = Self::model_for_user(db, task_id, user_id).await? else {
            return Ok(None);
        };

        let mut record: task::ActiveModel = existing.into();
        record.title = Set(data.title.clone());
        record.description = Set(data.description.clone());
        record.status = Set(data.status.clone());
        record.priority = Set(data.priority.clone());
        record.due_date = Set(data.due_date);
        record.tags = Set(tags_value(&data.tags)?);
        record.extras = Set(Value::Object(data.extras.clone()));
        record.updated_at = Set(Utc::now());

        let model = record.update(db).await?;
        Ok(Some(Self::from_model(model)))
    }

    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, DbErr> {
        let Some(owner_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(0);
        };

        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(task_id))
            .filter(task::Column::UserId.eq(owner_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn model_for_user<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<task::Model>, DbErr> {
        let Some(owner_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(None);
        };

        task::Entity::find()
            .filter(task::Column::Uuid.eq(task_id))
            .filter(task::Column::UserId.eq(owner_id))
            .one(db)
            .await
    }
}

fn tags_value(tags: &[String]) -> Result<Value, DbErr> {
    serde_json::to_value(tags).map_err(|err| DbErr::Custom(err.to_string()))
}
