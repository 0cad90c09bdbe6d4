//! # Reservation Repository
//!
//! The reservation store. A slot `(axis, year, week)` is held by at most one
//! user: the unique index `idx_reservations_axis_year_week` is the arbiter, the
//! lookup before each write only exists to produce a readable conflict message.

use crate::error::RepositoryError;
use crate::ledger::availability::BookedSlot;
use crate::ledger::coverage::Coverage;
use crate::ledger::validate_period;
use crate::models::axis::{self, Model as AxisModel};
use crate::models::reservation::{
    self, ActiveModel as ReservationActiveModel, Column, Entity as Reservation,
    Model as ReservationModel,
};
use crate::models::user;
use crate::repositories::axis::AxisRepository;
use chrono::Utc;
use metrics::counter;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

/// A reservation joined with its axis name and owner email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct ReservationDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "dg@example.com")]
    pub user_email: String,
    pub axis_id: Uuid,
    #[schema(example = "Thies - Mbour - Saly")]
    pub axis_name: String,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 10)]
    pub week: i32,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

/// Request to hold one slot
#[derive(Debug, Clone, Copy)]
pub struct NewReservation {
    pub user_id: Uuid,
    pub axis_id: Uuid,
    pub year: i32,
    pub week: i32,
}

/// Partial move of a reservation; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotChanges {
    pub axis_id: Option<Uuid>,
    pub year: Option<i32>,
    pub week: Option<i32>,
}

#[derive(Debug, FromQueryResult)]
struct CoverageRow {
    email: String,
    distinct_axes: i64,
}

/// Repository for Reservation database operations
pub struct ReservationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ReservationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Holds a slot for `request.user_id`.
    ///
    /// Validation happens before any storage access; an unknown axis is
    /// `NotFound`; a taken slot is `Conflict`, whether detected by the lookup
    /// or by the unique index when two writers race.
    pub async fn reserve(&self, request: NewReservation) -> Result<ReservationModel, RepositoryError> {
        validate_period(request.year, request.week)?;
        let axis = AxisRepository::new(self.db).require(request.axis_id).await?;

        if self
            .slot_holder(request.axis_id, request.year, request.week)
            .await?
            .is_some()
        {
            return Err(slot_conflict(&axis, request.year, request.week));
        }

        let reservation = self
            .insert_slot(request)
            .await
            .map_err(|err| as_slot_conflict(err, &axis, request.year, request.week))?;

        counter!("reservations_created_total").increment(1);
        tracing::info!(
            reservation_id = %reservation.id,
            user_id = %reservation.user_id,
            axis_id = %reservation.axis_id,
            year = reservation.year,
            week = reservation.week,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Plain insert with no pre-check; the unique index decides.
    async fn insert_slot(&self, request: NewReservation) -> Result<ReservationModel, RepositoryError> {
        ReservationActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(request.user_id),
            axis_id: Set(request.axis_id),
            year: Set(request.year),
            week: Set(request.week),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    /// Moves a reservation to another slot, re-checking the slot rule
    /// while ignoring the reservation itself.
    pub async fn update_slot(
        &self,
        id: Uuid,
        changes: SlotChanges,
    ) -> Result<ReservationModel, RepositoryError> {
        let existing = self.require(id).await?;
        let axis_id = changes.axis_id.unwrap_or(existing.axis_id);
        let year = changes.year.unwrap_or(existing.year);
        let week = changes.week.unwrap_or(existing.week);

        validate_period(year, week)?;
        let axis = AxisRepository::new(self.db).require(axis_id).await?;

        if (axis_id, year, week) == (existing.axis_id, existing.year, existing.week) {
            return Ok(existing);
        }

        let taken = Reservation::find()
            .filter(Column::AxisId.eq(axis_id))
            .filter(Column::Year.eq(year))
            .filter(Column::Week.eq(week))
            .filter(Column::Id.ne(existing.id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if taken.is_some() {
            return Err(slot_conflict(&axis, year, week));
        }

        let mut active = existing.into_active_model();
        active.axis_id = Set(axis_id);
        active.year = Set(year);
        active.week = Set(week);

        active
            .update(self.db)
            .await
            .map_err(|err| as_slot_conflict(RepositoryError::database_error(err), &axis, year, week))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = Reservation::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Reservation"));
        }
        Ok(())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<ReservationModel>, RepositoryError> {
        Reservation::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn require(&self, id: Uuid) -> Result<ReservationModel, RepositoryError> {
        self.find(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Reservation"))
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<ReservationDetail>, RepositoryError> {
        detail_query()
            .filter(Column::Id.eq(id))
            .into_model::<ReservationDetail>()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// The user's reservations, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ReservationDetail>, RepositoryError> {
        detail_query()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .into_model::<ReservationDetail>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Every reservation, newest first
    pub async fn list_all(&self) -> Result<Vec<ReservationDetail>, RepositoryError> {
        detail_query()
            .order_by_desc(Column::CreatedAt)
            .into_model::<ReservationDetail>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Email of whoever holds the slot, if anyone
    pub async fn slot_holder(
        &self,
        axis_id: Uuid,
        year: i32,
        week: i32,
    ) -> Result<Option<String>, RepositoryError> {
        let slot = booked_query()
            .filter(Column::AxisId.eq(axis_id))
            .filter(Column::Year.eq(year))
            .filter(Column::Week.eq(week))
            .into_model::<BookedSlot>()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(slot.map(|s| s.owner_email))
    }

    /// All taken slots of one axis in one year
    pub async fn booked_for_axis(
        &self,
        axis_id: Uuid,
        year: i32,
    ) -> Result<Vec<BookedSlot>, RepositoryError> {
        booked_query()
            .filter(Column::AxisId.eq(axis_id))
            .filter(Column::Year.eq(year))
            .into_model::<BookedSlot>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All taken slots of one year, every axis
    pub async fn booked_for_year(&self, year: i32) -> Result<Vec<BookedSlot>, RepositoryError> {
        booked_query()
            .filter(Column::Year.eq(year))
            .into_model::<BookedSlot>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All taken slots of one ISO week, every axis
    pub async fn booked_for_week(&self, year: i32, week: i32) -> Result<Vec<BookedSlot>, RepositoryError> {
        booked_query()
            .filter(Column::Year.eq(year))
            .filter(Column::Week.eq(week))
            .into_model::<BookedSlot>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Distinct axes the user has ever reserved
    pub async fn distinct_axes_for_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        Reservation::find()
            .select_only()
            .column(Column::AxisId)
            .filter(Column::UserId.eq(user_id))
            .distinct()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Coverage of every active DG user, in one grouped query, ordered by email.
    ///
    /// `excluded_email` is the principal admin, left out even if its flag is unset.
    pub async fn coverage_for_all(
        &self,
        total_axes: u32,
        excluded_email: &str,
    ) -> Result<Vec<Coverage>, RepositoryError> {
        let rows = user::Entity::find()
            .select_only()
            .column(user::Column::Email)
            .column_as(
                Expr::cust("COUNT(DISTINCT reservations.axis_id)"),
                "distinct_axes",
            )
            .join(JoinType::LeftJoin, user::Relation::Reservations.def())
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::IsAdmin.eq(false))
            .filter(user::Column::Email.ne(excluded_email.trim().to_lowercase()))
            .group_by(user::Column::Id)
            .group_by(user::Column::Email)
            .order_by_asc(user::Column::Email)
            .into_model::<CoverageRow>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                Coverage::new(
                    row.email,
                    u64::try_from(row.distinct_axes).unwrap_or(0),
                    total_axes,
                )
            })
            .collect())
    }
}

fn detail_query() -> Select<Reservation> {
    Reservation::find()
        .select_only()
        .column(Column::Id)
        .column(Column::UserId)
        .column_as(user::Column::Email, "user_email")
        .column(Column::AxisId)
        .column_as(axis::Column::Name, "axis_name")
        .column(Column::Year)
        .column(Column::Week)
        .column(Column::CreatedAt)
        .join(JoinType::InnerJoin, reservation::Relation::User.def())
        .join(JoinType::InnerJoin, reservation::Relation::Axis.def())
}

fn booked_query() -> Select<Reservation> {
    Reservation::find()
        .select_only()
        .column(Column::AxisId)
        .column(Column::Week)
        .column_as(user::Column::Email, "owner_email")
        .join(JoinType::InnerJoin, reservation::Relation::User.def())
}

fn slot_conflict(axis: &AxisModel, year: i32, week: i32) -> RepositoryError {
    counter!("reservation_conflicts_total").increment(1);
    RepositoryError::Conflict {
        message: format!(
            "Axis '{}' is already reserved for ISO week {} of {}",
            axis.name, week, year
        ),
        details: Some(json!({
            "axis_id": axis.id,
            "axis_name": axis.name,
            "year": year,
            "week": week,
        })),
    }
}

fn as_slot_conflict(err: RepositoryError, axis: &AxisModel, year: i32, week: i32) -> RepositoryError {
    match err {
        RepositoryError::Conflict { .. } => {
            tracing::debug!(axis_id = %axis.id, year, week, "Slot taken by a concurrent writer");
            slot_conflict(axis, year, week)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_db;
    use crate::ledger::coverage::coverage_rate;
    use crate::repositories::user::{NewUser, UserRepository};

    struct Fixture {
        db: DatabaseConnection,
        dg: user::Model,
        other: user::Model,
        thies: AxisModel,
        touba: AxisModel,
    }

    async fn fixture() -> Fixture {
        let db = memory_db().await;
        let users = UserRepository::new(&db);
        let dg = users
            .create(NewUser {
                email: "dg@example.com".to_string(),
                password: "password123".to_string(),
                is_admin: false,
                is_active: true,
            })
            .await
            .unwrap();
        let other = users
            .create(NewUser {
                email: "other@example.com".to_string(),
                password: "password123".to_string(),
                is_admin: false,
                is_active: true,
            })
            .await
            .unwrap();

        let axes = AxisRepository::new(&db);
        axes.ensure_named(&["Thies - Mbour - Saly", "Diourbel - Touba"])
            .await
            .unwrap();
        let thies = axes.find_by_name("Thies - Mbour - Saly").await.unwrap().unwrap();
        let touba = axes.find_by_name("Diourbel - Touba").await.unwrap().unwrap();

        Fixture {
            db,
            dg,
            other,
            thies,
            touba,
        }
    }

    fn slot(user: &user::Model, axis: &AxisModel, year: i32, week: i32) -> NewReservation {
        NewReservation {
            user_id: user.id,
            axis_id: axis.id,
            year,
            week,
        }
    }

    #[tokio::test]
    async fn second_reservation_of_a_slot_conflicts() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);

        repo.reserve(slot(&f.dg, &f.thies, 2025, 10)).await.unwrap();
        let err = repo
            .reserve(slot(&f.other, &f.thies, 2025, 10))
            .await
            .unwrap_err();

        match err {
            RepositoryError::Conflict { message, details } => {
                assert_eq!(
                    message,
                    "Axis 'Thies - Mbour - Saly' is already reserved for ISO week 10 of 2025"
                );
                let details = details.unwrap();
                assert_eq!(details["week"], 10);
                assert_eq!(details["year"], 2025);
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        // Same week on another axis, and same axis another year, are fine.
        repo.reserve(slot(&f.other, &f.touba, 2025, 10)).await.unwrap();
        repo.reserve(slot(&f.other, &f.thies, 2026, 10)).await.unwrap();
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates_that_skip_the_lookup() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);

        repo.insert_slot(slot(&f.dg, &f.thies, 2025, 10)).await.unwrap();
        let err = repo
            .insert_slot(slot(&f.other, &f.thies, 2025, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn concurrent_reservations_yield_exactly_one_success() {
        let f = fixture().await;
        let repo_a = ReservationRepository::new(&f.db);
        let repo_b = ReservationRepository::new(&f.db);

        let (a, b) = tokio::join!(
            repo_a.reserve(slot(&f.dg, &f.thies, 2025, 20)),
            repo_b.reserve(slot(&f.other, &f.thies, 2025, 20)),
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let failure = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(failure, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn invalid_period_fails_before_touching_storage() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);

        // An unknown axis would be NotFound; validation wins because it runs first.
        let err = repo
            .reserve(NewReservation {
                user_id: f.dg.id,
                axis_id: Uuid::new_v4(),
                year: 2025,
                week: 54,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { .. }));

        let err = repo.reserve(slot(&f.dg, &f.thies, 1999, 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { .. }));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_axis_is_not_found() {
        let f = fixture().await;
        let err = ReservationRepository::new(&f.db)
            .reserve(NewReservation {
                user_id: f.dg.id,
                axis_id: Uuid::new_v4(),
                year: 2025,
                week: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_slot_excludes_itself_and_detects_conflicts() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);
        let mine = repo.reserve(slot(&f.dg, &f.thies, 2025, 10)).await.unwrap();
        repo.reserve(slot(&f.other, &f.thies, 2025, 11)).await.unwrap();

        // Re-saving the same slot is not a conflict with itself.
        let same = repo
            .update_slot(
                mine.id,
                SlotChanges {
                    week: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.week, 10);

        let err = repo
            .update_slot(
                mine.id,
                SlotChanges {
                    week: Some(11),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        let moved = repo
            .update_slot(
                mine.id,
                SlotChanges {
                    axis_id: Some(f.touba.id),
                    week: Some(11),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!((moved.axis_id, moved.year, moved.week), (f.touba.id, 2025, 11));

        let err = repo
            .update_slot(
                mine.id,
                SlotChanges {
                    week: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { .. }));
    }

    #[tokio::test]
    async fn details_and_listings_carry_names_and_emails() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);
        let first = repo.reserve(slot(&f.dg, &f.thies, 2025, 10)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.reserve(slot(&f.dg, &f.touba, 2025, 12)).await.unwrap();
        repo.reserve(slot(&f.other, &f.touba, 2025, 13)).await.unwrap();

        let detail = repo.find_detail(first.id).await.unwrap().unwrap();
        assert_eq!(detail.user_email, "dg@example.com");
        assert_eq!(detail.axis_name, "Thies - Mbour - Saly");

        let mine = repo.list_for_user(f.dg.id).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id);

        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn booked_queries_return_owner_emails() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);
        repo.reserve(slot(&f.dg, &f.thies, 2025, 10)).await.unwrap();
        repo.reserve(slot(&f.other, &f.touba, 2025, 10)).await.unwrap();
        repo.reserve(slot(&f.other, &f.thies, 2025, 30)).await.unwrap();

        assert_eq!(
            repo.slot_holder(f.thies.id, 2025, 10).await.unwrap().as_deref(),
            Some("dg@example.com")
        );
        assert_eq!(repo.slot_holder(f.thies.id, 2025, 11).await.unwrap(), None);
        assert_eq!(repo.booked_for_axis(f.thies.id, 2025).await.unwrap().len(), 2);
        assert_eq!(repo.booked_for_year(2025).await.unwrap().len(), 3);
        assert_eq!(repo.booked_for_week(2025, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn coverage_counts_distinct_axes() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);
        repo.reserve(slot(&f.dg, &f.thies, 2025, 10)).await.unwrap();
        repo.reserve(slot(&f.dg, &f.thies, 2025, 11)).await.unwrap();
        repo.reserve(slot(&f.dg, &f.touba, 2025, 12)).await.unwrap();

        assert_eq!(repo.distinct_axes_for_user(f.dg.id).await.unwrap(), 2);
        assert_eq!(repo.distinct_axes_for_user(f.other.id).await.unwrap(), 0);

        let all = repo.coverage_for_all(7, "chief@example.com").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_email, "dg@example.com");
        assert_eq!(all[0].distinct_axes_count, 2);
        assert_eq!(all[0].coverage_rate, coverage_rate(2, 7));
        assert_eq!(all[1].user_email, "other@example.com");
        assert_eq!(all[1].distinct_axes_count, 0);

        let without_other = repo.coverage_for_all(7, "Other@Example.com").await.unwrap();
        assert_eq!(without_other.len(), 1);
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_reservations() {
        let f = fixture().await;
        let repo = ReservationRepository::new(&f.db);
        let reservation = repo.reserve(slot(&f.other, &f.thies, 2025, 10)).await.unwrap();

        let config = crate::config::AppConfig::default();
        UserRepository::new(&f.db).delete(f.other.id, &config).await.unwrap();

        assert!(repo.find(reservation.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(reservation.id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
