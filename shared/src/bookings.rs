use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::store::{LocalStore, BOOKINGS_KEY};
use crate::types::{Booking, BookingStatus, CabinClass, NewBooking};

/// Authoritative in-memory reservation ledger. Bookings are soft-deleted
/// (cancelled, record retained) and never removed; the collection persists
/// wholesale after every mutation, newest first.
pub struct BookingLedger {
    store: LocalStore,
    bookings: Vec<Booking>,
}

impl BookingLedger {
    pub fn load(store: LocalStore) -> Self {
        let bookings = store.read_json_or(BOOKINGS_KEY, seed_bookings);
        Self { store, bookings }
    }

    pub fn all(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn get(&self, id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Creates a reservation. The travel date is normalized to ISO when it
    /// parses; the id and booking date are assigned here; the status always
    /// starts Confirmed regardless of what the payload carried.
    pub fn create(&mut self, new: NewBooking) -> Result<Booking> {
        if new.passenger.trim().is_empty() {
            return Err(Error::Validation("passenger name is required".into()));
        }
        if new.seat.trim().is_empty() {
            return Err(Error::Validation("seat is required".into()));
        }
        if new.flight_number.trim().is_empty() {
            return Err(Error::Validation("flight number is required".into()));
        }

        let booking = Booking {
            id: new_booking_id(),
            flight_number: new.flight_number,
            airline: new.airline,
            from: new.from,
            from_code: new.from_code,
            to: new.to,
            to_code: new.to_code,
            date: normalize_date(&new.date),
            time: new.time,
            arrival: new.arrival,
            duration: new.duration,
            passenger: new.passenger,
            seat: new.seat,
            cabin: new.cabin,
            price: new.price,
            status: BookingStatus::Confirmed,
            booking_date: today().format("%Y-%m-%d").to_string(),
        };
        self.bookings.insert(0, booking.clone());
        self.persist();
        tracing::info!("Created booking {} on {}", booking.id, booking.flight_number);
        Ok(booking)
    }

    /// Flips the matching booking to Cancelled. Unknown ids are a silent
    /// no-op; the snapshot is rewritten either way.
    pub fn cancel(&mut self, id: &str) {
        if let Some(booking) = self.bookings.iter_mut().find(|b| b.id == id) {
            booking.status = BookingStatus::Cancelled;
        }
        self.persist();
    }

    /// Unconditional status overwrite. No transition guard: the caller
    /// owns the lifecycle rules. Pending -> Confirmed models a completed
    /// payment.
    pub fn set_status(&mut self, id: &str, status: BookingStatus) {
        if let Some(booking) = self.bookings.iter_mut().find(|b| b.id == id) {
            booking.status = status;
        }
        self.persist();
    }

    /// Confirmed or Pending bookings dated today or later (date-only
    /// comparison, today inclusive).
    pub fn upcoming(&self) -> Vec<&Booking> {
        self.upcoming_as_of(today())
    }

    pub fn upcoming_as_of(&self, today: NaiveDate) -> Vec<&Booking> {
        self.bookings
            .iter()
            .filter(|b| {
                matches!(b.status, BookingStatus::Confirmed | BookingStatus::Pending)
                    && date_only(&b.date) >= today
            })
            .collect()
    }

    /// Completed bookings, plus Confirmed bookings whose date has passed.
    /// The dual predicate keeps the view stable whether or not
    /// `reconcile_completed` has run since the date elapsed.
    pub fn past(&self) -> Vec<&Booking> {
        self.past_as_of(today())
    }

    pub fn past_as_of(&self, today: NaiveDate) -> Vec<&Booking> {
        self.bookings
            .iter()
            .filter(|b| {
                b.status == BookingStatus::Completed
                    || (b.status == BookingStatus::Confirmed && date_only(&b.date) < today)
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<&Booking> {
        self.bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Cancelled)
            .collect()
    }

    /// Materializes the Confirmed -> Completed transition for bookings
    /// whose travel date has passed. Returns how many were flipped.
    pub fn reconcile_completed(&mut self) -> usize {
        self.reconcile_completed_as_of(today())
    }

    pub fn reconcile_completed_as_of(&mut self, today: NaiveDate) -> usize {
        let mut flipped = 0;
        for booking in &mut self.bookings {
            if booking.status == BookingStatus::Confirmed && date_only(&booking.date) < today {
                booking.status = BookingStatus::Completed;
                flipped += 1;
            }
        }
        if flipped > 0 {
            tracing::info!("Marked {} past bookings as Completed", flipped);
            self.persist();
        }
        flipped
    }

    fn persist(&self) {
        self.store.write_json(BOOKINGS_KEY, &self.bookings);
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// "BK-" + four random digits, the shape printed on itineraries. The ledger
/// enforces no uniqueness; collisions are tolerated.
fn new_booking_id() -> String {
    let bytes = *uuid::Uuid::new_v4().as_bytes();
    let entropy = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("BK-{}", 1000 + entropy % 9000)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| NaiveDate::parse_from_str(s, "%b %d, %Y").ok())
        .or_else(|| NaiveDate::parse_from_str(s, "%B %d, %Y").ok())
}

/// ISO form when the string parses as a date, otherwise verbatim.
fn normalize_date(s: &str) -> String {
    match parse_date(s) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => s.to_string(),
    }
}

/// Unparseable dates classify as the epoch, i.e. maximally past. Bad data
/// lands in the past list instead of taking the views down.
fn date_only(s: &str) -> NaiveDate {
    parse_date(s).unwrap_or(NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch"))
}

/// Reservations shown before the traveller has booked anything.
fn seed_bookings() -> Vec<Booking> {
    vec![
        Booking {
            id: "BK-2451".into(),
            flight_number: "SW-101".into(),
            airline: "SkyWings Airways".into(),
            from: "New York".into(),
            from_code: "JFK".into(),
            to: "London".into(),
            to_code: "LHR".into(),
            date: "2025-10-25".into(),
            time: "10:30 AM".into(),
            arrival: "10:45 PM".into(),
            duration: "7h 15m".into(),
            passenger: "John Smith".into(),
            seat: "12A".into(),
            cabin: CabinClass::Business,
            price: 1200.0,
            status: BookingStatus::Confirmed,
            booking_date: "2025-10-10".into(),
        },
        Booking {
            id: "BK-2458".into(),
            flight_number: "SW-205".into(),
            airline: "SkyWings Premium".into(),
            from: "Los Angeles".into(),
            from_code: "LAX".into(),
            to: "Tokyo".into(),
            to_code: "NRT".into(),
            date: "2025-11-02".into(),
            time: "2:45 PM".into(),
            arrival: "6:30 PM +1".into(),
            duration: "11h 45m".into(),
            passenger: "John Smith".into(),
            seat: "8C".into(),
            cabin: CabinClass::Economy,
            price: 650.0,
            status: BookingStatus::Confirmed,
            booking_date: "2025-10-12".into(),
        },
        Booking {
            id: "BK-2387".into(),
            flight_number: "SW-445".into(),
            airline: "SkyWings International".into(),
            from: "Paris".into(),
            from_code: "CDG".into(),
            to: "New York".into(),
            to_code: "JFK".into(),
            date: "2025-09-15".into(),
            time: "11:00 AM".into(),
            arrival: "1:30 PM".into(),
            duration: "8h 30m".into(),
            passenger: "John Smith".into(),
            seat: "5B".into(),
            cabin: CabinClass::Business,
            price: 850.0,
            status: BookingStatus::Completed,
            booking_date: "2025-09-01".into(),
        },
        Booking {
            id: "BK-2312".into(),
            flight_number: "SW-312".into(),
            airline: "SkyWings Express".into(),
            from: "Dubai".into(),
            from_code: "DXB".into(),
            to: "Singapore".into(),
            to_code: "SIN".into(),
            date: "2025-08-20".into(),
            time: "8:15 AM".into(),
            arrival: "6:00 PM".into(),
            duration: "6h 45m".into(),
            passenger: "John Smith".into(),
            seat: "15F".into(),
            cabin: CabinClass::Economy,
            price: 620.0,
            status: BookingStatus::Completed,
            booking_date: "2025-08-05".into(),
        },
        Booking {
            id: "BK-2256".into(),
            flight_number: "SW-428".into(),
            airline: "SkyWings Connect".into(),
            from: "London".into(),
            from_code: "LHR".into(),
            to: "Sydney".into(),
            to_code: "SYD".into(),
            date: "2025-07-10".into(),
            time: "11:00 AM".into(),
            arrival: "9:30 AM +1".into(),
            duration: "19h 30m".into(),
            passenger: "John Smith".into(),
            seat: "22D".into(),
            cabin: CabinClass::Economy,
            price: 1250.0,
            status: BookingStatus::Completed,
            booking_date: "2025-06-25".into(),
        },
    ]
}
