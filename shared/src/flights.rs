use crate::error::{Error, Result};
use crate::store::{LocalStore, FLIGHTS_KEY};
use crate::types::{CabinClass, Flight, FlightPatch, FlightStatus, NewFlight, SystemStats};

/// Authoritative in-memory flight inventory. Loaded once at startup from
/// the durable store (seed dataset when absent), persisted wholesale after
/// every mutation. Newest flights sit at the front of the collection.
pub struct FlightDirectory {
    store: LocalStore,
    flights: Vec<Flight>,
}

impl FlightDirectory {
    pub fn load(store: LocalStore) -> Self {
        let flights = store.read_json_or(FLIGHTS_KEY, seed_flights);
        Self { store, flights }
    }

    pub fn all(&self) -> &[Flight] {
        &self.flights
    }

    pub fn get(&self, id: u32) -> Option<&Flight> {
        self.flights.iter().find(|f| f.id == id)
    }

    /// Adds a flight under the next id (1 + current max, 1 when empty) and
    /// prepends it so new inventory appears at the top of every list.
    pub fn add(&mut self, new: NewFlight) -> Result<Flight> {
        if !(0.0..=5.0).contains(&new.rating) {
            return Err(Error::Validation(format!(
                "rating {} outside 0.0-5.0",
                new.rating
            )));
        }
        if !new.price.is_finite() || new.price < 0.0 {
            return Err(Error::Validation(format!("invalid price {}", new.price)));
        }

        let next_id = self.flights.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        let flight = Flight {
            id: next_id,
            airline: new.airline,
            flight_number: new.flight_number,
            from: new.from,
            to: new.to,
            departure: new.departure,
            arrival: new.arrival,
            duration: new.duration,
            date: new.date,
            price: new.price,
            cabin: new.cabin,
            stops: new.stops,
            rating: new.rating,
            status: new.status,
            aircraft: new.aircraft,
            capacity: new.capacity,
            booked: new.booked,
        };
        self.flights.insert(0, flight.clone());
        self.persist();
        tracing::info!("Added flight {} ({})", flight.id, flight.flight_number);
        Ok(flight)
    }

    /// Merges the patch into the matching flight. An unknown id is a silent
    /// no-op; the snapshot is rewritten either way.
    pub fn update(&mut self, id: u32, patch: FlightPatch) {
        if let Some(flight) = self.flights.iter_mut().find(|f| f.id == id) {
            if let Some(airline) = patch.airline {
                flight.airline = airline;
            }
            if let Some(flight_number) = patch.flight_number {
                flight.flight_number = flight_number;
            }
            if let Some(from) = patch.from {
                flight.from = from;
            }
            if let Some(to) = patch.to {
                flight.to = to;
            }
            if let Some(departure) = patch.departure {
                flight.departure = departure;
            }
            if let Some(arrival) = patch.arrival {
                flight.arrival = arrival;
            }
            if let Some(duration) = patch.duration {
                flight.duration = duration;
            }
            if let Some(date) = patch.date {
                flight.date = date;
            }
            if let Some(price) = patch.price {
                flight.price = price;
            }
            if let Some(cabin) = patch.cabin {
                flight.cabin = cabin;
            }
            if let Some(stops) = patch.stops {
                flight.stops = stops;
            }
            if let Some(rating) = patch.rating {
                flight.rating = rating;
            }
            if let Some(status) = patch.status {
                flight.status = status;
            }
            if let Some(aircraft) = patch.aircraft {
                flight.aircraft = aircraft;
            }
            if let Some(capacity) = patch.capacity {
                flight.capacity = capacity;
            }
            if let Some(booked) = patch.booked {
                flight.booked = booked;
            }
        }
        self.persist();
    }

    /// Removes the flight. Bookings keep their copied flight fields, so
    /// nothing cascades.
    pub fn remove(&mut self, id: u32) {
        self.flights.retain(|f| f.id != id);
        self.persist();
    }

    /// Aggregate dashboard numbers. `total_users` comes from the user
    /// directory (role = User count); the rest derives from the inventory.
    /// An empty inventory reports 0 for the rate and average fields.
    pub fn stats(&self, total_users: usize) -> SystemStats {
        let total_flights = self.flights.len();
        let total_revenue: f64 = self
            .flights
            .iter()
            .map(|f| f.price * f64::from(f.booked))
            .sum();
        let active_flights = self
            .flights
            .iter()
            .filter(|f| matches!(f.status, FlightStatus::Active | FlightStatus::Scheduled))
            .count();
        // Same subset as active_flights: a flight counts as on time unless
        // it is Delayed or Cancelled.
        let on_time_flights = self
            .flights
            .iter()
            .filter(|f| matches!(f.status, FlightStatus::Active | FlightStatus::Scheduled))
            .count();

        let (on_time_rate, average_rating) = if total_flights == 0 {
            (0.0, 0.0)
        } else {
            (
                on_time_flights as f64 / total_flights as f64 * 100.0,
                self.flights.iter().map(|f| f.rating).sum::<f64>() / total_flights as f64,
            )
        };

        SystemStats {
            total_flights,
            total_users,
            active_flights,
            total_revenue,
            on_time_rate,
            average_rating,
        }
    }

    fn persist(&self) {
        self.store.write_json(FLIGHTS_KEY, &self.flights);
    }
}

/// Launch inventory shown before an admin has saved anything.
fn seed_flights() -> Vec<Flight> {
    vec![
        Flight {
            id: 1,
            airline: "SkyWings Airways".into(),
            flight_number: "SW-101".into(),
            from: "New York (JFK)".into(),
            to: "London (LHR)".into(),
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
        },
        Flight {
            id: 2,
            airline: "SkyWings Premium".into(),
            flight_number: "SW-205".into(),
            from: "Los Angeles (LAX)".into(),
            to: "Tokyo (NRT)".into(),
            departure: "2:45 PM".into(),
            arrival: "6:30 PM +1".into(),
            duration: "11h 45m".into(),
            date: "Oct 26, 2025".into(),
            price: 1200.0,
            cabin: CabinClass::Business,
            stops: "Non-stop".into(),
            rating: 4.9,
            status: FlightStatus::Active,
            aircraft: "Airbus A350".into(),
            capacity: 298,
            booked: 245,
        },
        Flight {
            id: 3,
            airline: "SkyWings Express".into(),
            flight_number: "SW-312".into(),
            from: "Dubai (DXB)".into(),
            to: "Singapore (SIN)".into(),
            departure: "8:15 AM".into(),
            arrival: "6:00 PM".into(),
            duration: "6h 45m".into(),
            date: "Oct 27, 2025".into(),
            price: 480.0,
            cabin: CabinClass::Economy,
            stops: "Non-stop".into(),
            rating: 4.7,
            status: FlightStatus::Active,
            aircraft: "Boeing 777".into(),
            capacity: 368,
            booked: 302,
        },
        Flight {
            id: 4,
            airline: "SkyWings Connect".into(),
            flight_number: "SW-428".into(),
            from: "Paris (CDG)".into(),
            to: "Sydney (SYD)".into(),
            departure: "11:00 AM".into(),
            arrival: "9:30 AM +1".into(),
            duration: "19h 30m".into(),
            date: "Oct 28, 2025".into(),
            price: 890.0,
            cabin: CabinClass::Economy,
            stops: "1 Stop".into(),
            rating: 4.6,
            status: FlightStatus::Delayed,
            aircraft: "Airbus A380".into(),
            capacity: 525,
            booked: 412,
        },
        Flight {
            id: 5,
            airline: "SkyWings First".into(),
            flight_number: "SW-599".into(),
            from: "Miami (MIA)".into(),
            to: "Barcelona (BCN)".into(),
            departure: "5:20 PM".into(),
            arrival: "7:15 AM +1".into(),
            duration: "8h 55m".into(),
            date: "Oct 29, 2025".into(),
            price: 2100.0,
            cabin: CabinClass::FirstClass,
            stops: "Non-stop".into(),
            rating: 5.0,
            status: FlightStatus::Active,
            aircraft: "Boeing 787".into(),
            capacity: 248,
            booked: 198,
        },
        Flight {
            id: 6,
            airline: "SkyWings Regional".into(),
            flight_number: "SW-645".into(),
            from: "Toronto (YYZ)".into(),
            to: "Vancouver (YVR)".into(),
            departure: "9:00 AM".into(),
            arrival: "11:30 AM".into(),
            duration: "4h 30m".into(),
            date: "Oct 30, 2025".into(),
            price: 320.0,
            cabin: CabinClass::Economy,
            stops: "Non-stop".into(),
            rating: 4.5,
            status: FlightStatus::Scheduled,
            aircraft: "Airbus A320".into(),
            capacity: 186,
            booked: 124,
        },
    ]
}
