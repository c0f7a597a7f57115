//! Derived views: pure functions over container state, recomputed on every
//! call. Nothing here mutates or caches anything.

use serde::Serialize;
use std::cmp::Ordering;

use crate::bookings::BookingLedger;
use crate::flights::FlightDirectory;
use crate::types::{Booking, BookingStatus, CabinClass, Flight, NewBooking, SystemStats};
use crate::users::UserDirectory;

// ========== FLIGHT SEARCH ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Cheapest first
    Price,
    /// Best rated first
    Rating,
    /// Shortest first
    Duration,
    /// Earliest departure first
    Departure,
}

#[derive(Debug, Clone)]
pub struct FlightQuery {
    /// Case-insensitive substring matched against origin, destination,
    /// airline and flight number. Empty matches everything.
    pub text: String,
    pub cabin: Option<CabinClass>,
    pub sort: SortKey,
}

impl Default for FlightQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            cabin: None,
            sort: SortKey::Price,
        }
    }
}

/// Maps the filter vocabulary the search form uses to a cabin class.
/// "all" and anything unrecognized mean no filter.
pub fn cabin_filter(value: &str) -> Option<CabinClass> {
    match value {
        "economy" => Some(CabinClass::Economy),
        "business" => Some(CabinClass::Business),
        "first" => Some(CabinClass::FirstClass),
        _ => None,
    }
}

pub fn search_flights<'a>(flights: &'a [Flight], query: &FlightQuery) -> Vec<&'a Flight> {
    let text = query.text.trim().to_lowercase();
    let mut results: Vec<&Flight> = flights
        .iter()
        .filter(|f| {
            if text.is_empty() {
                return true;
            }
            [&f.from, &f.to, &f.airline, &f.flight_number]
                .iter()
                .any(|field| field.to_lowercase().contains(&text))
        })
        .filter(|f| query.cabin.map_or(true, |cabin| f.cabin == cabin))
        .collect();

    match query.sort {
        SortKey::Price => {
            results.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal))
        }
        SortKey::Rating => {
            results.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal))
        }
        SortKey::Duration => results.sort_by_key(|f| parse_duration_min(&f.duration)),
        SortKey::Departure => results.sort_by_key(|f| parse_clock_min(&f.departure)),
    }
    results
}

/// "7h 15m" -> 435, "4h 30m" -> 270. Anything that does not look like an
/// hours-and-minutes string sorts to the front as 0.
pub fn parse_duration_min(duration: &str) -> u32 {
    let Some((hours, rest)) = duration.trim().split_once('h') else {
        return 0;
    };
    let Ok(hours) = hours.trim().parse::<u32>() else {
        return 0;
    };
    let minutes = rest
        .trim()
        .trim_end_matches('m')
        .trim()
        .parse::<u32>()
        .unwrap_or(0);
    hours * 60 + minutes
}

/// "2:45 PM" -> 885 minutes since midnight. A trailing "+1" overnight
/// marker is ignored; unparseable strings degrade to 0.
pub fn parse_clock_min(time: &str) -> u32 {
    let clean = time.trim().trim_end_matches("+1").trim();
    match chrono::NaiveTime::parse_from_str(clean, "%I:%M %p") {
        Ok(t) => {
            use chrono::Timelike;
            t.hour() * 60 + t.minute()
        }
        Err(_) => 0,
    }
}

// ========== BOOKING DRAFTS ==========

/// Splits "New York (JFK)" into ("New York", "JFK"). The code comes back
/// empty when no parenthesized airport code is present.
pub fn split_city_code(endpoint: &str) -> (String, String) {
    match endpoint.split_once(" (") {
        Some((city, rest)) => (city.to_string(), rest.trim_end_matches(')').to_string()),
        None => (endpoint.trim().to_string(), String::new()),
    }
}

/// Builds the booking payload for a flight, copying the flight fields by
/// value, so later flight edits never reach bookings made before them.
pub fn booking_draft(flight: &Flight, passenger: &str, seat: &str, cabin: CabinClass) -> NewBooking {
    let (from, from_code) = split_city_code(&flight.from);
    let (to, to_code) = split_city_code(&flight.to);
    NewBooking {
        flight_number: flight.flight_number.clone(),
        airline: flight.airline.clone(),
        from,
        from_code,
        to,
        to_code,
        date: flight.date.clone(),
        time: flight.departure.clone(),
        arrival: flight.arrival.clone(),
        duration: flight.duration.clone(),
        passenger: passenger.to_string(),
        seat: seat.to_string(),
        cabin,
        price: flight.price,
        status: BookingStatus::Confirmed,
    }
}

// ========== DASHBOARD ==========

/// How many rows the overview widgets show.
pub const RECENT_LIMIT: usize = 4;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stats: SystemStats,
    pub upcoming_bookings: usize,
    pub past_bookings: usize,
    pub cancelled_bookings: usize,
    /// First rows in insertion order, which is newest-first by the
    /// prepend-on-create contract.
    pub recent_flights: Vec<Flight>,
    pub recent_bookings: Vec<Booking>,
}

pub fn dashboard(
    flights: &FlightDirectory,
    users: &UserDirectory,
    bookings: &BookingLedger,
) -> DashboardSnapshot {
    DashboardSnapshot {
        stats: flights.stats(users.user_count()),
        upcoming_bookings: bookings.upcoming().len(),
        past_bookings: bookings.past().len(),
        cancelled_bookings: bookings.cancelled().len(),
        recent_flights: flights.all().iter().take(RECENT_LIMIT).cloned().collect(),
        recent_bookings: bookings.all().iter().take(RECENT_LIMIT).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlightStatus, NewFlight};

    fn flight(id: u32, from: &str, to: &str, airline: &str, number: &str) -> Flight {
        Flight {
            id,
            airline: airline.into(),
            flight_number: number.into(),
            from: from.into(),
            to: to.into(),
            departure: "10:30 AM".into(),
            arrival: "10:45 PM".into(),
            duration: "7h 15m".into(),
            date: "Oct 25, 2025".into(),
            price: 650.0,
            cabin: CabinClass::Economy,
            stops: "Non-stop".into(),
            rating: 4.8,
            status: FlightStatus::Active,
            aircraft: "Boeing 787".into(),
            capacity: 242,
            booked: 189,
        }
    }

    #[test]
    fn search_matches_airport_codes_case_insensitively() {
        let flights = vec![
            flight(1, "New York (JFK)", "London (LHR)", "SkyWings Airways", "SW-101"),
            flight(2, "Los Angeles (LAX)", "Tokyo (NRT)", "SkyWings Premium", "SW-205"),
        ];
        let query = FlightQuery {
            text: "jfk".into(),
            ..FlightQuery::default()
        };
        let results = search_flights(&flights, &query);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn search_matches_airline_and_flight_number() {
        let flights = vec![
            flight(1, "New York (JFK)", "London (LHR)", "SkyWings Airways", "SW-101"),
            flight(2, "Los Angeles (LAX)", "Tokyo (NRT)", "SkyWings Premium", "SW-205"),
        ];
        let by_airline = search_flights(
            &flights,
            &FlightQuery {
                text: "premium".into(),
                ..FlightQuery::default()
            },
        );
        assert_eq!(by_airline.len(), 1);
        assert_eq!(by_airline[0].id, 2);

        let by_number = search_flights(
            &flights,
            &FlightQuery {
                text: "sw-101".into(),
                ..FlightQuery::default()
            },
        );
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].id, 1);
    }

    #[test]
    fn cabin_filter_uses_the_fixed_vocabulary() {
        assert_eq!(cabin_filter("economy"), Some(CabinClass::Economy));
        assert_eq!(cabin_filter("business"), Some(CabinClass::Business));
        assert_eq!(cabin_filter("first"), Some(CabinClass::FirstClass));
        assert_eq!(cabin_filter("all"), None);
        assert_eq!(cabin_filter("premium"), None);
    }

    #[test]
    fn cabin_filter_narrows_results() {
        let mut business = flight(1, "New York (JFK)", "London (LHR)", "SkyWings Airways", "SW-101");
        business.cabin = CabinClass::Business;
        let economy = flight(2, "Los Angeles (LAX)", "Tokyo (NRT)", "SkyWings Premium", "SW-205");
        let flights = vec![business, economy];

        let results = search_flights(
            &flights,
            &FlightQuery {
                cabin: cabin_filter("business"),
                ..FlightQuery::default()
            },
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn duration_sort_puts_the_shorter_flight_first() {
        let mut long = flight(1, "New York (JFK)", "London (LHR)", "SkyWings Airways", "SW-101");
        long.duration = "7h 15m".into();
        let mut short = flight(2, "Toronto (YYZ)", "Vancouver (YVR)", "SkyWings Regional", "SW-645");
        short.duration = "4h 30m".into();
        let flights = vec![long, short];

        let results = search_flights(
            &flights,
            &FlightQuery {
                sort: SortKey::Duration,
                ..FlightQuery::default()
            },
        );
        assert_eq!(results[0].id, 2);
        assert_eq!(results[1].id, 1);
    }

    #[test]
    fn rating_sort_is_descending() {
        let mut low = flight(1, "A (AAA)", "B (BBB)", "SkyWings", "SW-1");
        low.rating = 4.1;
        let mut high = flight(2, "C (CCC)", "D (DDD)", "SkyWings", "SW-2");
        high.rating = 4.9;
        let flights = vec![low, high];

        let results = search_flights(
            &flights,
            &FlightQuery {
                sort: SortKey::Rating,
                ..FlightQuery::default()
            },
        );
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn departure_sort_handles_am_pm_and_overflow_markers() {
        let mut evening = flight(1, "A (AAA)", "B (BBB)", "SkyWings", "SW-1");
        evening.departure = "5:20 PM".into();
        let mut morning = flight(2, "C (CCC)", "D (DDD)", "SkyWings", "SW-2");
        morning.departure = "9:00 AM".into();
        let mut overnight = flight(3, "E (EEE)", "F (FFF)", "SkyWings", "SW-3");
        overnight.departure = "2:45 PM +1".into();
        let flights = vec![evening, morning, overnight];

        let results = search_flights(
            &flights,
            &FlightQuery {
                sort: SortKey::Departure,
                ..FlightQuery::default()
            },
        );
        let order: Vec<u32> = results.iter().map(|f| f.id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn duration_parser_degrades_to_zero() {
        assert_eq!(parse_duration_min("7h 15m"), 435);
        assert_eq!(parse_duration_min("4h 30m"), 270);
        assert_eq!(parse_duration_min("19h 30m"), 1170);
        assert_eq!(parse_duration_min("about a day"), 0);
        assert_eq!(parse_duration_min(""), 0);
    }

    #[test]
    fn clock_parser_handles_noon_and_midnight() {
        assert_eq!(parse_clock_min("12:00 AM"), 0);
        assert_eq!(parse_clock_min("12:30 PM"), 750);
        assert_eq!(parse_clock_min("2:45 PM"), 885);
        assert_eq!(parse_clock_min("6:30 PM +1"), 1110);
        assert_eq!(parse_clock_min("half past nine"), 0);
    }

    #[test]
    fn split_city_code_extracts_the_parenthesized_code() {
        assert_eq!(
            split_city_code("New York (JFK)"),
            ("New York".to_string(), "JFK".to_string())
        );
        assert_eq!(split_city_code("Springfield"), ("Springfield".to_string(), String::new()));
    }

    #[test]
    fn booking_draft_copies_flight_fields_by_value() {
        let f = flight(1, "New York (JFK)", "London (LHR)", "SkyWings Airways", "SW-101");
        let draft = booking_draft(&f, "John Smith", "12A", CabinClass::Business);
        assert_eq!(draft.from, "New York");
        assert_eq!(draft.from_code, "JFK");
        assert_eq!(draft.to, "London");
        assert_eq!(draft.to_code, "LHR");
        assert_eq!(draft.time, f.departure);
        assert_eq!(draft.price, f.price);
        assert_eq!(draft.cabin, CabinClass::Business);
    }
}
