use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "room_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Available,
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Cash,
    Bank,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub capacity: i32,
    pub default_rent: Decimal,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub national_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A time-bounded binding of one tenant to one room. `end_date` is null while
/// the tenant still resides in the room.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Occupancy {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub room_id: Uuid,
    pub agreed_rent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub check_in_notes: Option<String>,
    pub check_out_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MonthlyCharge {
    pub id: Uuid,
    pub occupancy_id: Uuid,
    pub month: i16,
    pub year: i32,
    pub rent_amount: Decimal,
    pub water_bill: Decimal,
    pub other_charges: Decimal,
    pub charge_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl MonthlyCharge {
    /// The amount a charge contributes to a tenant's ledger and arrears.
    /// Other charges are tracked on the record but billed separately.
    pub fn billed_amount(&self) -> Decimal {
        self.rent_amount + self.water_bill
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub monthly_charge_id: Option<Uuid>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub receipt_reference: Option<String>,
    pub payment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
