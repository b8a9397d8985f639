use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{ClientId, FeatureRequestId, ProductAreaId};
use crate::rank::Rank;

/// A client owns a group of feature requests; its id is the group key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArea {
    pub id: ProductAreaId,
    pub name: String,
}

/// A feature request ranked within its client's group.
///
/// `id` is `None` until the store inserts the request. The `priority` must
/// only change through the reassignment engine, which keeps ranks unique per
/// client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub id: Option<FeatureRequestId>,
    pub title: String,
    pub description: String,
    pub priority: Rank,
    pub target_date: Option<NaiveDate>,
    pub client_id: ClientId,
    pub product_area_id: ProductAreaId,
}

impl FeatureRequest {
    pub fn new(
        client_id: ClientId,
        product_area_id: ProductAreaId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Rank,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            priority,
            target_date: None,
            client_id,
            product_area_id,
        }
    }

    pub fn with_target_date(mut self, target_date: NaiveDate) -> Self {
        self.target_date = Some(target_date);
        self
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Field-level checks that must pass before the request touches a store.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidData("title must not be empty".into()));
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::InvalidData("description must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureRequest {
        FeatureRequest::new(
            ClientId::from_raw(1),
            ProductAreaId::from_raw(2),
            "Export to CSV",
            "Policies page needs a CSV export",
            Rank::FIRST,
        )
    }

    #[test]
    fn new_request_has_no_id() {
        let req = sample();
        assert!(req.is_new());
        assert!(req.target_date.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_title_is_invalid() {
        let mut req = sample();
        req.title = "   ".into();
        assert!(matches!(req.validate(), Err(CoreError::InvalidData(_))));
    }

    #[test]
    fn blank_description_is_invalid() {
        let mut req = sample();
        req.description = String::new();
        assert!(matches!(req.validate(), Err(CoreError::InvalidData(_))));
    }

    #[test]
    fn target_date_is_optional() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        let req = sample().with_target_date(date);
        assert_eq!(req.target_date, Some(date));
    }
}
