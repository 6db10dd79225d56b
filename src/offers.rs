//! Flight offers: the external API shape, per-offer summaries and sorting

use crate::catalog::AirportCatalog;
use crate::{CabinClass, FlightError, IataCode, SortKey};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Parameters of a single one-way offer lookup
#[derive(Debug, Clone, PartialEq)]
pub struct OfferQuery {
    pub origin: IataCode,
    pub destination: IataCode,
    pub departure_date: NaiveDate,
    pub adults: u32,
    pub cabin_class: CabinClass,
    pub max_results: u32,
}

/// Anything that can return flight offers for a query
#[async_trait]
pub trait FlightOfferSource: Send + Sync {
    async fn search_offers(&self, query: &OfferQuery) -> Result<Vec<FlightOffer>, FlightError>;
}

/// Offer as returned by the flight offers API (fields we use)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub price: OfferPrice,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferPrice {
    pub total: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub carrier_code: String,
    pub number: String,
    pub departure: SegmentEndpoint,
    pub arrival: SegmentEndpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpoint {
    pub iata_code: String,
    pub at: String,
}

/// Hours and minutes of an itinerary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightDuration {
    pub hours: u32,
    pub minutes: u32,
}

impl FlightDuration {
    pub fn total_minutes(&self) -> u32 {
        self.hours.saturating_mul(60).saturating_add(self.minutes)
    }
}

impl fmt::Display for FlightDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hrs {} Min", self.hours, self.minutes)
    }
}

fn duration_regex() -> &'static Regex {
    static DURATION_RE: OnceLock<Regex> = OnceLock::new();
    DURATION_RE.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:\d+(?:\.\d+)?S)?)?$")
            .expect("duration pattern is valid")
    })
}

/// Parse a compact ISO-8601 duration such as `PT1H30M`.
///
/// Missing components count as zero, days are folded into hours, seconds
/// are dropped. Input that is not a duration token yields zero. Values too
/// large for `u32` saturate.
pub fn parse_duration(token: &str) -> FlightDuration {
    let Some(captures) = duration_regex().captures(token.trim()) else {
        if !token.trim().is_empty() {
            warn!(token = token, "Unrecognised duration token");
        }
        return FlightDuration::default();
    };

    let component = |i: usize| {
        captures
            .get(i)
            .map(|m| m.as_str().parse::<u32>().unwrap_or(u32::MAX))
            .unwrap_or(0)
    };

    FlightDuration {
        hours: component(1).saturating_mul(24).saturating_add(component(2)),
        minutes: component(3),
    }
}

/// Result row for one offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSummary {
    pub id: String,
    pub airline: String,
    pub flight_number: String,
    pub departure_time: String,
    pub departure_airport: String,
    pub arrival_time: String,
    pub arrival_airport: String,
    pub duration: String,
    pub duration_minutes: u32,
    pub stops: String,
    pub price: f64,
    pub currency: String,
    pub origin: String,
    pub destination: String,
    pub origin_name: String,
    pub destination_name: String,
}

impl OfferSummary {
    /// Summarise the first itinerary of an offer.
    ///
    /// Returns `None` for offers without segments or with an unreadable
    /// price; those cannot be shown or sorted.
    pub fn from_offer(
        offer: &FlightOffer,
        origin: &IataCode,
        destination: &IataCode,
        catalog: &AirportCatalog,
    ) -> Option<Self> {
        let Some(itinerary) = offer.itineraries.first() else {
            warn!(offer_id = %offer.id, "Offer has no itineraries");
            return None;
        };
        let (Some(first), Some(last)) = (itinerary.segments.first(), itinerary.segments.last())
        else {
            warn!(offer_id = %offer.id, "Itinerary has no segments");
            return None;
        };
        let price = match offer.price.total.trim().parse::<f64>() {
            Ok(price) => price,
            Err(_) => {
                warn!(offer_id = %offer.id, total = %offer.price.total, "Unreadable offer price");
                return None;
            }
        };

        let duration = parse_duration(&itinerary.duration);

        Some(OfferSummary {
            id: offer.id.clone(),
            airline: first.carrier_code.clone(),
            flight_number: format!("{}-{}", first.carrier_code, first.number),
            departure_time: format_timestamp(&first.departure.at),
            departure_airport: first.departure.iata_code.clone(),
            arrival_time: format_timestamp(&last.arrival.at),
            arrival_airport: last.arrival.iata_code.clone(),
            duration: duration.to_string(),
            duration_minutes: duration.total_minutes(),
            stops: stops_label(itinerary.segments.len().saturating_sub(1)),
            price,
            currency: offer.price.currency.clone(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            origin_name: catalog.display_name(origin.as_str()),
            destination_name: catalog.display_name(destination.as_str()),
        })
    }
}

/// `NON-STOP`, `1 STOP`, `2 STOPS`, ...
pub fn stops_label(stops: usize) -> String {
    match stops {
        0 => "NON-STOP".to_string(),
        1 => "1 STOP".to_string(),
        n => format!("{} STOPS", n),
    }
}

/// Render `2025-08-15T10:30:00` as `2025-08-15 10:30`
pub fn format_timestamp(at: &str) -> String {
    match NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => at.replacen('T', " ", 1).chars().take(16).collect(),
    }
}

/// Stable in-place sort; `None` keeps the order of the source.
pub fn sort_offers(offers: &mut [OfferSummary], key: Option<SortKey>) {
    match key {
        Some(SortKey::Cheapest) => offers.sort_by(|a, b| a.price.total_cmp(&b.price)),
        Some(SortKey::Fastest) => offers.sort_by_key(|o| o.duration_minutes),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(carrier: &str, number: &str, from: &str, dep: &str, to: &str, arr: &str) -> Segment {
        Segment {
            carrier_code: carrier.to_string(),
            number: number.to_string(),
            departure: SegmentEndpoint {
                iata_code: from.to_string(),
                at: dep.to_string(),
            },
            arrival: SegmentEndpoint {
                iata_code: to.to_string(),
                at: arr.to_string(),
            },
        }
    }

    fn offer(id: &str, total: &str, duration: &str, segments: Vec<Segment>) -> FlightOffer {
        FlightOffer {
            id: id.to_string(),
            price: OfferPrice {
                total: total.to_string(),
                currency: "EUR".to_string(),
            },
            itineraries: vec![Itinerary {
                duration: duration.to_string(),
                segments,
            }],
        }
    }

    fn summary(id: &str, price: f64, minutes: u32) -> OfferSummary {
        OfferSummary {
            id: id.to_string(),
            airline: "PK".to_string(),
            flight_number: "PK-785".to_string(),
            departure_time: String::new(),
            departure_airport: "KHI".to_string(),
            arrival_time: String::new(),
            arrival_airport: "LHR".to_string(),
            duration: String::new(),
            duration_minutes: minutes,
            stops: stops_label(0),
            price,
            currency: "EUR".to_string(),
            origin: "KHI".to_string(),
            destination: "LHR".to_string(),
            origin_name: "Jinnah International".to_string(),
            destination_name: "Heathrow".to_string(),
        }
    }

    #[test]
    fn test_parse_duration_components() {
        assert_eq!(parse_duration("PT1H30M"), FlightDuration { hours: 1, minutes: 30 });
        assert_eq!(parse_duration("PT45M"), FlightDuration { hours: 0, minutes: 45 });
        assert_eq!(parse_duration("PT12H"), FlightDuration { hours: 12, minutes: 0 });
        assert_eq!(parse_duration("P1DT2H5M"), FlightDuration { hours: 26, minutes: 5 });
        assert_eq!(parse_duration("PT7H10M30S").total_minutes(), 430);
    }

    #[test]
    fn test_parse_duration_degrades_to_zero() {
        assert_eq!(parse_duration(""), FlightDuration::default());
        assert_eq!(parse_duration("1h30"), FlightDuration::default());
        assert_eq!(parse_duration("PT"), FlightDuration::default());
    }

    #[test]
    fn test_huge_durations_saturate() {
        let days = parse_duration("P999999999D");
        assert_eq!(days.hours, u32::MAX);
        assert_eq!(days.total_minutes(), u32::MAX);

        let digits = parse_duration("PT99999999999H59M");
        assert_eq!(digits.hours, u32::MAX);
        assert_eq!(digits.minutes, 59);

        let near_limit = FlightDuration { hours: u32::MAX / 60, minutes: 59 };
        assert_eq!(near_limit.total_minutes(), u32::MAX);
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(parse_duration("PT8H5M").to_string(), "8 Hrs 5 Min");
        assert_eq!(parse_duration("PT45M").to_string(), "0 Hrs 45 Min");
    }

    #[test]
    fn test_stops_label() {
        assert_eq!(stops_label(0), "NON-STOP");
        assert_eq!(stops_label(1), "1 STOP");
        assert_eq!(stops_label(3), "3 STOPS");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2025-08-15T10:30:00"), "2025-08-15 10:30");
        assert_eq!(format_timestamp("2025-08-15T10:30"), "2025-08-15 10:30");
    }

    #[test]
    fn test_summary_uses_first_and_last_segment() {
        let catalog = AirportCatalog::bundled().unwrap();
        let offer = offer(
            "1",
            "512.40",
            "PT11H20M",
            vec![
                segment("EK", "601", "KHI", "2025-08-15T04:00:00", "DXB", "2025-08-15T05:15:00"),
                segment("EK", "1", "DXB", "2025-08-15T07:45:00", "LHR", "2025-08-15T12:20:00"),
            ],
        );
        let origin = IataCode::parse("KHI").unwrap();
        let destination = IataCode::parse("LHR").unwrap();

        let summary = OfferSummary::from_offer(&offer, &origin, &destination, &catalog).unwrap();
        assert_eq!(summary.airline, "EK");
        assert_eq!(summary.flight_number, "EK-601");
        assert_eq!(summary.departure_time, "2025-08-15 04:00");
        assert_eq!(summary.departure_airport, "KHI");
        assert_eq!(summary.arrival_time, "2025-08-15 12:20");
        assert_eq!(summary.arrival_airport, "LHR");
        assert_eq!(summary.stops, "1 STOP");
        assert_eq!(summary.duration, "11 Hrs 20 Min");
        assert_eq!(summary.duration_minutes, 680);
        assert_eq!(summary.price, 512.40);
        assert_eq!(summary.origin_name, "Jinnah International");
        assert_eq!(summary.destination_name, "Heathrow");
    }

    #[test]
    fn test_summary_falls_back_to_code_for_unknown_airport() {
        let catalog = AirportCatalog::bundled().unwrap();
        let offer = offer(
            "2",
            "99.00",
            "PT1H",
            vec![segment("XX", "9", "XYZ", "2025-08-15T04:00:00", "LHR", "2025-08-15T05:00:00")],
        );
        let origin = IataCode::parse("XYZ").unwrap();
        let destination = IataCode::parse("LHR").unwrap();

        let summary = OfferSummary::from_offer(&offer, &origin, &destination, &catalog).unwrap();
        assert_eq!(summary.origin_name, "XYZ");
        assert_eq!(summary.stops, "NON-STOP");
    }

    #[test]
    fn test_summary_skips_unusable_offers() {
        let catalog = AirportCatalog::bundled().unwrap();
        let code = IataCode::parse("LHR").unwrap();
        let empty = offer("3", "10.00", "PT1H", vec![]);
        assert!(OfferSummary::from_offer(&empty, &code, &code, &catalog).is_none());

        let unpriced = offer(
            "4",
            "n/a",
            "PT1H",
            vec![segment("BA", "1", "LHR", "2025-08-15T04:00:00", "JFK", "2025-08-15T05:00:00")],
        );
        assert!(OfferSummary::from_offer(&unpriced, &code, &code, &catalog).is_none());
    }

    #[test]
    fn test_sort_cheapest_and_fastest() {
        let mut offers = vec![
            summary("a", 300.0, 400),
            summary("b", 120.5, 900),
            summary("c", 120.5, 300),
            summary("d", 800.0, 200),
        ];

        sort_offers(&mut offers, Some(SortKey::Cheapest));
        let ids: Vec<_> = offers.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
        assert!(offers.windows(2).all(|w| w[0].price <= w[1].price));

        sort_offers(&mut offers, Some(SortKey::Fastest));
        let ids: Vec<_> = offers.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
        assert!(offers.windows(2).all(|w| w[0].duration_minutes <= w[1].duration_minutes));

        sort_offers(&mut offers, None);
        let ids: Vec<_> = offers.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn test_offer_deserializes_from_api_json() {
        let json = r#"{
            "type": "flight-offer",
            "id": "1",
            "price": {"currency": "EUR", "total": "355.34", "base": "255.00"},
            "itineraries": [{
                "duration": "PT14H15M",
                "segments": [{
                    "departure": {"iataCode": "SYD", "terminal": "1", "at": "2025-11-01T11:35:00"},
                    "arrival": {"iataCode": "MNL", "terminal": "2", "at": "2025-11-01T16:50:00"},
                    "carrierCode": "PR",
                    "number": "212",
                    "numberOfStops": 0
                }]
            }]
        }"#;
        let offer: FlightOffer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.itineraries[0].segments[0].carrier_code, "PR");
        assert_eq!(offer.itineraries[0].segments[0].departure.iata_code, "SYD");
        assert_eq!(parse_duration(&offer.itineraries[0].duration).total_minutes(), 855);
    }
}
