use serde::{Deserialize, Serialize};

// ========== FLIGHT ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: u32,
    pub airline: String,
    pub flight_number: String,
    /// Free text in "City (CODE)" form, e.g. "New York (JFK)"
    pub from: String,
    pub to: String,
    pub departure: String,
    pub arrival: String,
    pub duration: String,
    pub date: String,
    pub price: f64,
    #[serde(rename = "class")]
    pub cabin: CabinClass,
    pub stops: String,
    pub rating: f64,
    pub status: FlightStatus,
    pub aircraft: String,
    pub capacity: u32,
    /// Seats sold so far. Expected to stay at or below capacity, but the
    /// directory does not enforce it.
    pub booked: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Active,
    Delayed,
    Cancelled,
    Scheduled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CabinClass {
    Economy,
    Business,
    #[serde(rename = "First Class")]
    FirstClass,
}

/// Admin "add flight" form payload. The directory assigns the id.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewFlight {
    pub airline: String,
    pub flight_number: String,
    pub from: String,
    pub to: String,
    pub departure: String,
    pub arrival: String,
    pub duration: String,
    pub date: String,
    pub price: f64,
    #[serde(rename = "class")]
    pub cabin: CabinClass,
    pub stops: String,
    pub rating: f64,
    pub status: FlightStatus,
    pub aircraft: String,
    pub capacity: u32,
    pub booked: u32,
}

/// Partial update for a flight; `None` leaves the field unchanged.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlightPatch {
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub duration: Option<String>,
    pub date: Option<String>,
    pub price: Option<f64>,
    #[serde(rename = "class")]
    pub cabin: Option<CabinClass>,
    pub stops: Option<String>,
    pub rating: Option<f64>,
    pub status: Option<FlightStatus>,
    pub aircraft: Option<String>,
    pub capacity: Option<u32>,
    pub booked: Option<u32>,
}

// ========== USER ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// "USR-###" for end users, "ADM-###" for seeded admins. Assigned from
    /// the current user count, so ids can repeat after deletions.
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub member_since: String,
    pub total_flights: u32,
    pub loyalty_points: u32,
    pub status: UserStatus,
    pub last_login: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Suspended,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Suspended => "Suspended",
            UserStatus::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub member_since: String,
    pub total_flights: u32,
    pub loyalty_points: u32,
    pub status: UserStatus,
    pub last_login: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub member_since: Option<String>,
    pub total_flights: Option<u32>,
    pub loyalty_points: Option<u32>,
    pub status: Option<UserStatus>,
    pub last_login: Option<String>,
}

// ========== BOOKING ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// "BK-####", four random digits. Collisions are tolerated.
    pub id: String,
    pub flight_number: String,
    pub airline: String,
    pub from: String,
    pub from_code: String,
    pub to: String,
    pub to_code: String,
    /// ISO "YYYY-MM-DD" when the submitted date parsed, otherwise verbatim.
    pub date: String,
    pub time: String,
    pub arrival: String,
    pub duration: String,
    pub passenger: String,
    pub seat: String,
    #[serde(rename = "class")]
    pub cabin: CabinClass,
    pub price: f64,
    pub status: BookingStatus,
    pub booking_date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Completed,
    Cancelled,
}

/// "Book flight" payload. The ledger assigns the id and the booking date,
/// and forces the initial status to Confirmed whatever the caller suggests.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub flight_number: String,
    pub airline: String,
    pub from: String,
    pub from_code: String,
    pub to: String,
    pub to_code: String,
    pub date: String,
    pub time: String,
    pub arrival: String,
    pub duration: String,
    pub passenger: String,
    pub seat: String,
    #[serde(rename = "class")]
    pub cabin: CabinClass,
    pub price: f64,
    pub status: BookingStatus,
}

// ========== STATS ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_flights: usize,
    pub total_users: usize,
    pub active_flights: usize,
    pub total_revenue: f64,
    pub on_time_rate: f64,
    pub average_rating: f64,
}
