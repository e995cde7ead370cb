//! Scope checks shared by the write and read operations.
//!
//! The engine never verifies credentials; it resolves what the verified
//! actor may touch. Anything outside the actor's community (or, for
//! residents, outside their owned parcels) is reported as not found rather
//! than leaking its existence.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, expenses, parcels};

use super::{Actor, Engine};

impl Engine {
    /// Administrator gate for catalog mutations.
    pub(super) fn require_admin(&self, actor: &Actor) -> ResultEngine<()> {
        if !actor.is_admin() {
            return Err(EngineError::Validation(
                "administrator role required".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads a parcel the actor may act on: same community, and owned by
    /// the actor unless the actor is an administrator.
    pub(super) async fn require_parcel_in_scope(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        parcel_id: Uuid,
    ) -> ResultEngine<parcels::Model> {
        let model = parcels::Entity::find_by_id(parcel_id.to_string())
            .filter(parcels::Column::CommunityId.eq(actor.community_id.clone()))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("parcel not exists".to_string()))?;

        if !actor.is_admin() && model.owner_id != actor.user_id {
            return Err(EngineError::NotFound("parcel not exists".to_string()));
        }
        Ok(model)
    }

    /// Loads an expense within the actor's community.
    pub(super) async fn require_expense_in_community(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        expense_id: Uuid,
    ) -> ResultEngine<expenses::Model> {
        expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::Column::CommunityId.eq(actor.community_id.clone()))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("expense not exists".to_string()))
    }

    /// All parcels of a community, in insertion order.
    pub(super) async fn parcels_of_community(
        &self,
        db_tx: &DatabaseTransaction,
        community_id: &str,
    ) -> ResultEngine<Vec<parcels::Model>> {
        parcels::Entity::find()
            .filter(parcels::Column::CommunityId.eq(community_id.to_string()))
            .all(db_tx)
            .await
            .map_err(Into::into)
    }

    /// Parcels owned by the actor inside their community.
    pub(super) async fn parcels_owned_by(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
    ) -> ResultEngine<Vec<parcels::Model>> {
        parcels::Entity::find()
            .filter(parcels::Column::CommunityId.eq(actor.community_id.clone()))
            .filter(parcels::Column::OwnerId.eq(actor.user_id.clone()))
            .all(db_tx)
            .await
            .map_err(Into::into)
    }

    /// Resolves an explicit parcel list against the community: every id
    /// must exist there.
    pub(super) async fn parcels_in_community(
        &self,
        db_tx: &DatabaseTransaction,
        community_id: &str,
        parcel_ids: &[Uuid],
    ) -> ResultEngine<Vec<parcels::Model>> {
        let mut models = Vec::with_capacity(parcel_ids.len());
        for parcel_id in parcel_ids {
            let model = parcels::Entity::find_by_id(parcel_id.to_string())
                .filter(parcels::Column::CommunityId.eq(community_id.to_string()))
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("parcel not exists".to_string()))?;
            models.push(model);
        }
        Ok(models)
    }
}
