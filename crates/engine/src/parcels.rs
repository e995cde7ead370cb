//! Read-only parcel reference.
//!
//! Parcels belong to the surrounding community management system; the
//! billing core only reads them for proration weights and ownership
//! scoping. Seeding happens through the admin CLI.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    /// Surface in square meters; the BySurface proration weight.
    pub area: i64,
    pub community_id: String,
    pub owner_id: String,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "parcels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub area: i64,
    pub community_id: String,
    pub owner_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::obligations::Entity")]
    Obligations,
}

impl Related<super::obligations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obligations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Parcel {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("parcel not exists".to_string()))?,
            area: model.area,
            community_id: model.community_id,
            owner_id: model.owner_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_converts_to_domain_parcel() {
        let id = Uuid::new_v4();
        let model = Model {
            id: id.to_string(),
            area: 120,
            community_id: "c1".to_string(),
            owner_id: "alice".to_string(),
        };

        let parcel = Parcel::try_from(model).unwrap();
        assert_eq!(parcel.id, id);
        assert_eq!(parcel.area, 120);
        assert_eq!(parcel.community_id, "c1");
        assert_eq!(parcel.owner_id, "alice");
    }

    #[test]
    fn malformed_id_is_not_found() {
        let model = Model {
            id: "not-a-uuid".to_string(),
            area: 1,
            community_id: "c1".to_string(),
            owner_id: "alice".to_string(),
        };

        assert!(matches!(
            Parcel::try_from(model),
            Err(EngineError::NotFound(_))
        ));
    }
}
