//! Occupancy lifecycle engine: check-in, room switch and check-out.
//!
//! Every operation here runs inside a transaction owned by the caller and
//! receives the connection explicitly; the engine holds no ambient database
//! state. Room availability checks take a row lock on the room so two
//! concurrent transitions on the same room serialize, and the partial unique
//! indexes on active occupancies catch anything that slips past the lock.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Occupancy, Room, RoomStatus, Tenant};

#[derive(Debug, Clone)]
pub struct NewTenantCheckIn {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub national_id: String,
    pub room_id: Uuid,
    pub agreed_rent: Decimal,
    pub start_date: NaiveDate,
    pub check_in_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RoomSwitch {
    pub room_id: Uuid,
    pub agreed_rent: Decimal,
    pub switch_date: NaiveDate,
    pub check_out_notes: Option<String>,
    pub check_in_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckOut {
    pub end_date: NaiveDate,
    pub check_out_notes: Option<String>,
}

#[derive(Debug)]
pub struct CheckInOutcome {
    pub tenant: Tenant,
    pub occupancy: Occupancy,
    pub room: Room,
}

#[derive(Debug)]
pub struct SwitchOutcome {
    pub tenant: Tenant,
    pub old_occupancy: Occupancy,
    pub old_room: Room,
    pub new_occupancy: Occupancy,
    pub new_room: Room,
}

#[derive(Debug)]
pub struct CheckOutOutcome {
    pub tenant: Tenant,
    pub occupancy: Occupancy,
    pub room: Room,
}

/// Register a brand-new tenant and place them in an available room.
pub async fn check_in_new_tenant(
    conn: &mut PgConnection,
    input: NewTenantCheckIn,
) -> AppResult<CheckInOutcome> {
    let room = lock_room(conn, input.room_id).await?;
    ensure_room_available(&room)?;
    ensure_identity_unused(conn, &input.email, &input.national_id).await?;

    let tenant = sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (name, email, phone, national_id)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(input.name.trim())
    .bind(input.email.trim())
    .bind(input.phone.trim())
    .bind(input.national_id.trim())
    .fetch_one(&mut *conn)
    .await?;

    let occupancy = insert_occupancy(
        conn,
        tenant.id,
        room.id,
        input.agreed_rent,
        input.start_date,
        input.check_in_notes,
    )
    .await?;
    let room = set_room_status(conn, room.id, RoomStatus::Occupied).await?;

    tracing::info!(
        tenant_id = %tenant.id,
        room_number = %room.room_number,
        "Tenant checked in"
    );

    Ok(CheckInOutcome {
        tenant,
        occupancy,
        room,
    })
}

/// Move a tenant with an active occupancy into a different available room,
/// ending the old occupancy and starting a new one on the switch date.
pub async fn switch_room(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    input: RoomSwitch,
) -> AppResult<SwitchOutcome> {
    let tenant = get_tenant(conn, tenant_id).await?;
    let active = active_occupancy(conn, tenant_id).await?.ok_or_else(|| {
        AppError::Conflict(
            "Tenant has no active occupancy. Use check-in to register a new tenant.".to_string(),
        )
    })?;

    if active.room_id == input.room_id {
        return Err(AppError::Conflict(
            "Tenant is already occupying this room.".to_string(),
        ));
    }

    // Lock both rooms in id order so two opposite switches cannot deadlock.
    let (first, second) = if active.room_id < input.room_id {
        (active.room_id, input.room_id)
    } else {
        (input.room_id, active.room_id)
    };
    let room_a = lock_room(conn, first).await?;
    let room_b = lock_room(conn, second).await?;
    let (old_room, new_room) = if room_a.id == active.room_id {
        (room_a, room_b)
    } else {
        (room_b, room_a)
    };
    ensure_room_available(&new_room)?;

    let check_out_notes = input
        .check_out_notes
        .unwrap_or_else(|| switch_out_note(&new_room.room_number, input.switch_date));
    let old_occupancy =
        end_occupancy(conn, active.id, input.switch_date, &check_out_notes).await?;
    let old_room = set_room_status(conn, old_room.id, RoomStatus::Available).await?;

    let check_in_notes = input
        .check_in_notes
        .unwrap_or_else(|| switch_in_note(&old_room.room_number, input.switch_date));
    let new_occupancy = insert_occupancy(
        conn,
        tenant.id,
        new_room.id,
        input.agreed_rent,
        input.switch_date,
        Some(check_in_notes),
    )
    .await?;
    let new_room = set_room_status(conn, new_room.id, RoomStatus::Occupied).await?;

    tracing::info!(
        tenant_id = %tenant.id,
        from = %old_room.room_number,
        to = %new_room.room_number,
        "Tenant switched rooms"
    );

    Ok(SwitchOutcome {
        tenant,
        old_occupancy,
        old_room,
        new_occupancy,
        new_room,
    })
}

/// End a tenant's active occupancy without a replacement room.
pub async fn check_out(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    input: CheckOut,
) -> AppResult<CheckOutOutcome> {
    let tenant = get_tenant(conn, tenant_id).await?;
    let active = active_occupancy(conn, tenant_id).await?.ok_or_else(|| {
        AppError::Conflict("Tenant has no active occupancy.".to_string())
    })?;
    let room = lock_room(conn, active.room_id).await?;

    let check_out_notes = input
        .check_out_notes
        .unwrap_or_else(|| check_out_note(&room.room_number, input.end_date));
    let occupancy = end_occupancy(conn, active.id, input.end_date, &check_out_notes).await?;
    let room = set_room_status(conn, room.id, RoomStatus::Available).await?;

    tracing::info!(
        tenant_id = %tenant.id,
        room_number = %room.room_number,
        "Tenant checked out"
    );

    Ok(CheckOutOutcome {
        tenant,
        occupancy,
        room,
    })
}

/// Remove an occupancy record outright. Allowed only while no monthly
/// charge references it; deleting an active occupancy frees its room.
pub async fn delete_occupancy(
    conn: &mut PgConnection,
    occupancy_id: Uuid,
) -> AppResult<Occupancy> {
    let billed: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM monthly_charges WHERE occupancy_id = $1)",
    )
    .bind(occupancy_id)
    .fetch_one(&mut *conn)
    .await?;
    if billed {
        return Err(AppError::Conflict(
            "Occupancy has monthly charges and cannot be deleted.".to_string(),
        ));
    }

    let occupancy = sqlx::query_as::<_, Occupancy>(
        "DELETE FROM occupancies WHERE id = $1 RETURNING *",
    )
    .bind(occupancy_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Occupancy not found.".to_string()))?;

    if occupancy.end_date.is_none() {
        set_room_status(conn, occupancy.room_id, RoomStatus::Available).await?;
    }

    Ok(occupancy)
}

async fn get_tenant(conn: &mut PgConnection, tenant_id: Uuid) -> AppResult<Tenant> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))
}

/// Fetch a room and take a row lock so availability cannot change under us
/// for the remainder of the transaction.
async fn lock_room(conn: &mut PgConnection, room_id: Uuid) -> AppResult<Room> {
    sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found.".to_string()))
}

async fn active_occupancy(
    conn: &mut PgConnection,
    tenant_id: Uuid,
) -> AppResult<Option<Occupancy>> {
    let occupancy = sqlx::query_as::<_, Occupancy>(
        "SELECT * FROM occupancies WHERE tenant_id = $1 AND end_date IS NULL FOR UPDATE",
    )
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(occupancy)
}

async fn ensure_identity_unused(
    conn: &mut PgConnection,
    email: &str,
    national_id: &str,
) -> AppResult<()> {
    let national_id_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE national_id = $1)")
            .bind(national_id.trim())
            .fetch_one(&mut *conn)
            .await?;
    if national_id_taken {
        return Err(AppError::Conflict(
            "Tenant with same national id already exists.".to_string(),
        ));
    }

    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE email = $1)")
            .bind(email.trim())
            .fetch_one(&mut *conn)
            .await?;
    if email_taken {
        return Err(AppError::Conflict(
            "Tenant with same email already exists.".to_string(),
        ));
    }
    Ok(())
}

async fn insert_occupancy(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    room_id: Uuid,
    agreed_rent: Decimal,
    start_date: NaiveDate,
    check_in_notes: Option<String>,
) -> AppResult<Occupancy> {
    let occupancy = sqlx::query_as::<_, Occupancy>(
        "INSERT INTO occupancies (tenant_id, room_id, agreed_rent, start_date, check_in_notes)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(room_id)
    .bind(agreed_rent)
    .bind(start_date)
    .bind(check_in_notes)
    .fetch_one(&mut *conn)
    .await?;
    Ok(occupancy)
}

async fn end_occupancy(
    conn: &mut PgConnection,
    occupancy_id: Uuid,
    end_date: NaiveDate,
    check_out_notes: &str,
) -> AppResult<Occupancy> {
    let occupancy = sqlx::query_as::<_, Occupancy>(
        "UPDATE occupancies SET end_date = $2, check_out_notes = $3
         WHERE id = $1
         RETURNING *",
    )
    .bind(occupancy_id)
    .bind(end_date)
    .bind(check_out_notes)
    .fetch_one(&mut *conn)
    .await?;
    Ok(occupancy)
}

async fn set_room_status(
    conn: &mut PgConnection,
    room_id: Uuid,
    status: RoomStatus,
) -> AppResult<Room> {
    let room = sqlx::query_as::<_, Room>(
        "UPDATE rooms SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(room_id)
    .bind(status)
    .fetch_one(&mut *conn)
    .await?;
    Ok(room)
}

fn ensure_room_available(room: &Room) -> AppResult<()> {
    if room.status == RoomStatus::Available {
        return Ok(());
    }
    Err(AppError::Conflict("Room not available.".to_string()))
}

fn switch_out_note(new_room_number: &str, switch_date: NaiveDate) -> String {
    format!("Tenant switched to room {new_room_number} on {switch_date}.")
}

fn switch_in_note(old_room_number: &str, switch_date: NaiveDate) -> String {
    format!("Tenant switched from room {old_room_number} on {switch_date}.")
}

fn check_out_note(room_number: &str, end_date: NaiveDate) -> String {
    format!("Tenant checked out of room {room_number} on {end_date}.")
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{check_out_note, ensure_room_available, switch_in_note, switch_out_note};
    use crate::models::{Room, RoomStatus};

    fn room(status: RoomStatus) -> Room {
        Room {
            id: Uuid::new_v4(),
            room_number: "A1".to_string(),
            capacity: 1,
            default_rent: Decimal::from(8000),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_available_rooms_pass_the_guard() {
        assert!(ensure_room_available(&room(RoomStatus::Available)).is_ok());
        let error = ensure_room_available(&room(RoomStatus::Occupied)).unwrap_err();
        assert_eq!(error.to_string(), "Room not available.");
    }

    #[test]
    fn default_notes_name_the_other_room_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            switch_out_note("B2", date),
            "Tenant switched to room B2 on 2024-03-15."
        );
        assert_eq!(
            switch_in_note("A1", date),
            "Tenant switched from room A1 on 2024-03-15."
        );
        assert_eq!(
            check_out_note("A1", date),
            "Tenant checked out of room A1 on 2024-03-15."
        );
    }
}
