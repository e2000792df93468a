//! Hardcoded last-resort table of high-traffic cities and airports.
//!
//! Matching is exact on code, name or a known alias. No scoring.

use crate::core::normalizer::{as_iata_code, normalize_query};
use crate::domain::model::{LookupResult, ResultKind, Source};
use std::collections::HashMap;

/// code, name, city, country, country code, lat, lon, timezone, aliases
type AirportRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    f64,
    f64,
    &'static str,
    &'static [&'static str],
);

/// code, name, country, country code, lat, lon, timezone, members (primary first), aliases
type MetroRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    f64,
    f64,
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
);

const NAME_CONFIDENCE: f64 = 0.95;

#[rustfmt::skip]
const METROS: &[MetroRow] = &[
    ("NYC", "New York", "United States", "US", 40.7128, -74.0060, "America/New_York", &["JFK", "EWR", "LGA"], &["new york", "nyc", "manhattan", "big apple"]),
    ("LON", "London", "United Kingdom", "GB", 51.5072, -0.1276, "Europe/London", &["LHR", "LGW", "STN", "LTN", "LCY"], &["london"]),
    ("PAR", "Paris", "France", "FR", 48.8566, 2.3522, "Europe/Paris", &["CDG", "ORY"], &["paris"]),
    ("TYO", "Tokyo", "Japan", "JP", 35.6762, 139.6503, "Asia/Tokyo", &["HND", "NRT"], &["tokyo"]),
    ("YTO", "Toronto", "Canada", "CA", 43.6532, -79.3832, "America/Toronto", &["YYZ", "YTZ"], &["toronto"]),
    ("CHI", "Chicago", "United States", "US", 41.8781, -87.6298, "America/Chicago", &["ORD", "MDW"], &["chicago"]),
    ("WAS", "Washington", "United States", "US", 38.9072, -77.0369, "America/New_York", &["IAD", "DCA", "BWI"], &["washington", "washington dc", "washington d.c.", "dc"]),
    ("MIL", "Milan", "Italy", "IT", 45.4642, 9.1900, "Europe/Rome", &["MXP", "LIN", "BGY"], &["milan", "milano"]),
    ("ROM", "Rome", "Italy", "IT", 41.9028, 12.4964, "Europe/Rome", &["FCO", "CIA"], &["rome", "roma"]),
    ("MOW", "Moscow", "Russia", "RU", 55.7558, 37.6173, "Europe/Moscow", &["SVO", "DME", "VKO"], &["moscow"]),
    ("STO", "Stockholm", "Sweden", "SE", 59.3293, 18.0686, "Europe/Stockholm", &["ARN", "BMA"], &["stockholm"]),
    ("OSA", "Osaka", "Japan", "JP", 34.6937, 135.5023, "Asia/Tokyo", &["KIX", "ITM"], &["osaka"]),
    ("SAO", "Sao Paulo", "Brazil", "BR", -23.5505, -46.6333, "America/Sao_Paulo", &["GRU", "CGH"], &["sao paulo", "são paulo"]),
    ("RIO", "Rio de Janeiro", "Brazil", "BR", -22.9068, -43.1729, "America/Sao_Paulo", &["GIG", "SDU"], &["rio de janeiro", "rio"]),
    ("BUE", "Buenos Aires", "Argentina", "AR", -34.6037, -58.3816, "America/Argentina/Buenos_Aires", &["EZE", "AEP"], &["buenos aires"]),
    ("SEL", "Seoul", "South Korea", "KR", 37.5665, 126.9780, "Asia/Seoul", &["ICN", "GMP"], &["seoul"]),
    ("BJS", "Beijing", "China", "CN", 39.9042, 116.4074, "Asia/Shanghai", &["PEK", "PKX"], &["beijing", "peking"]),
    ("SHA", "Shanghai", "China", "CN", 31.2304, 121.4737, "Asia/Shanghai", &["PVG", "SHA"], &["shanghai"]),
    ("YMQ", "Montreal", "Canada", "CA", 45.5019, -73.5674, "America/Toronto", &["YUL"], &["montreal", "montréal"]),
];

#[rustfmt::skip]
const AIRPORTS: &[AirportRow] = &[
    ("JFK", "John F. Kennedy International Airport", "New York", "United States", "US", 40.6413, -73.7781, "America/New_York", &["jfk", "kennedy", "john f kennedy"]),
    ("EWR", "Newark Liberty International Airport", "Newark", "United States", "US", 40.6895, -74.1745, "America/New_York", &["newark"]),
    ("LGA", "LaGuardia Airport", "New York", "United States", "US", 40.7769, -73.8740, "America/New_York", &["laguardia", "la guardia"]),
    ("LHR", "London Heathrow Airport", "London", "United Kingdom", "GB", 51.4700, -0.4543, "Europe/London", &["heathrow"]),
    ("LGW", "London Gatwick Airport", "London", "United Kingdom", "GB", 51.1537, -0.1821, "Europe/London", &["gatwick"]),
    ("CDG", "Paris Charles de Gaulle Airport", "Paris", "France", "FR", 49.0097, 2.5479, "Europe/Paris", &["charles de gaulle", "roissy"]),
    ("ORY", "Paris Orly Airport", "Paris", "France", "FR", 48.7262, 2.3652, "Europe/Paris", &["orly"]),
    ("HND", "Tokyo Haneda Airport", "Tokyo", "Japan", "JP", 35.5494, 139.7798, "Asia/Tokyo", &["haneda"]),
    ("NRT", "Narita International Airport", "Tokyo", "Japan", "JP", 35.7720, 140.3929, "Asia/Tokyo", &["narita"]),
    ("YYZ", "Toronto Pearson International Airport", "Toronto", "Canada", "CA", 43.6777, -79.6248, "America/Toronto", &["pearson", "toronto pearson"]),
    ("ORD", "O'Hare International Airport", "Chicago", "United States", "US", 41.9742, -87.9073, "America/Chicago", &["o'hare", "ohare"]),
    ("IAD", "Washington Dulles International Airport", "Washington", "United States", "US", 38.9531, -77.4565, "America/New_York", &["dulles"]),
    ("MXP", "Milan Malpensa Airport", "Milan", "Italy", "IT", 45.6306, 8.7281, "Europe/Rome", &["malpensa"]),
    ("FCO", "Leonardo da Vinci-Fiumicino Airport", "Rome", "Italy", "IT", 41.8003, 12.2389, "Europe/Rome", &["fiumicino"]),
    ("SVO", "Sheremetyevo International Airport", "Moscow", "Russia", "RU", 55.9726, 37.4146, "Europe/Moscow", &["sheremetyevo"]),
    ("ARN", "Stockholm Arlanda Airport", "Stockholm", "Sweden", "SE", 59.6498, 17.9238, "Europe/Stockholm", &["arlanda"]),
    ("KIX", "Kansai International Airport", "Osaka", "Japan", "JP", 34.4320, 135.2304, "Asia/Tokyo", &["kansai"]),
    ("GRU", "Sao Paulo/Guarulhos International Airport", "Sao Paulo", "Brazil", "BR", -23.4356, -46.4731, "America/Sao_Paulo", &["guarulhos"]),
    ("GIG", "Rio de Janeiro/Galeao International Airport", "Rio de Janeiro", "Brazil", "BR", -22.8053, -43.2566, "America/Sao_Paulo", &["galeao"]),
    ("EZE", "Ministro Pistarini International Airport", "Buenos Aires", "Argentina", "AR", -34.8222, -58.5358, "America/Argentina/Buenos_Aires", &["ezeiza"]),
    ("ICN", "Incheon International Airport", "Seoul", "South Korea", "KR", 37.4602, 126.4407, "Asia/Seoul", &["incheon"]),
    ("PEK", "Beijing Capital International Airport", "Beijing", "China", "CN", 40.0799, 116.6031, "Asia/Shanghai", &["beijing capital"]),
    ("PVG", "Shanghai Pudong International Airport", "Shanghai", "China", "CN", 31.1443, 121.8083, "Asia/Shanghai", &["pudong"]),
    ("SHA", "Shanghai Hongqiao International Airport", "Shanghai", "China", "CN", 31.1979, 121.3363, "Asia/Shanghai", &["hongqiao"]),
    ("YUL", "Montreal-Trudeau International Airport", "Montreal", "Canada", "CA", 45.4706, -73.7408, "America/Toronto", &["trudeau"]),
    ("LAX", "Los Angeles International Airport", "Los Angeles", "United States", "US", 33.9416, -118.4085, "America/Los_Angeles", &["los angeles", "la"]),
    ("SFO", "San Francisco International Airport", "San Francisco", "United States", "US", 37.6213, -122.3790, "America/Los_Angeles", &["san francisco", "sf"]),
    ("MIA", "Miami International Airport", "Miami", "United States", "US", 25.7959, -80.2870, "America/New_York", &["miami"]),
    ("ATL", "Hartsfield-Jackson Atlanta International Airport", "Atlanta", "United States", "US", 33.6407, -84.4277, "America/New_York", &["atlanta"]),
    ("DFW", "Dallas/Fort Worth International Airport", "Dallas", "United States", "US", 32.8998, -97.0403, "America/Chicago", &["dallas", "fort worth"]),
    ("DEN", "Denver International Airport", "Denver", "United States", "US", 39.8561, -104.6737, "America/Denver", &["denver"]),
    ("SEA", "Seattle-Tacoma International Airport", "Seattle", "United States", "US", 47.4502, -122.3088, "America/Los_Angeles", &["seattle", "sea-tac"]),
    ("BOS", "Boston Logan International Airport", "Boston", "United States", "US", 42.3656, -71.0096, "America/New_York", &["boston", "logan"]),
    ("LAS", "Harry Reid International Airport", "Las Vegas", "United States", "US", 36.0840, -115.1537, "America/Los_Angeles", &["las vegas", "vegas"]),
    ("YVR", "Vancouver International Airport", "Vancouver", "Canada", "CA", 49.1967, -123.1815, "America/Vancouver", &["vancouver"]),
    ("MEX", "Mexico City International Airport", "Mexico City", "Mexico", "MX", 19.4361, -99.0719, "America/Mexico_City", &["mexico"]),
    ("AMS", "Amsterdam Airport Schiphol", "Amsterdam", "Netherlands", "NL", 52.3105, 4.7683, "Europe/Amsterdam", &["amsterdam", "schiphol"]),
    ("FRA", "Frankfurt Airport", "Frankfurt", "Germany", "DE", 50.0379, 8.5622, "Europe/Berlin", &["frankfurt"]),
    ("MAD", "Adolfo Suarez Madrid-Barajas Airport", "Madrid", "Spain", "ES", 40.4983, -3.5676, "Europe/Madrid", &["madrid", "barajas"]),
    ("BCN", "Josep Tarradellas Barcelona-El Prat Airport", "Barcelona", "Spain", "ES", 41.2974, 2.0833, "Europe/Madrid", &["barcelona", "el prat"]),
    ("ZRH", "Zurich Airport", "Zurich", "Switzerland", "CH", 47.4582, 8.5555, "Europe/Zurich", &["zurich", "zürich"]),
    ("IST", "Istanbul Airport", "Istanbul", "Turkey", "TR", 41.2753, 28.7519, "Europe/Istanbul", &["istanbul"]),
    ("DXB", "Dubai International Airport", "Dubai", "United Arab Emirates", "AE", 25.2532, 55.3657, "Asia/Dubai", &["dubai"]),
    ("DOH", "Hamad International Airport", "Doha", "Qatar", "QA", 25.2731, 51.6081, "Asia/Qatar", &["doha"]),
    ("DEL", "Indira Gandhi International Airport", "Delhi", "India", "IN", 28.5562, 77.1000, "Asia/Kolkata", &["delhi", "new delhi"]),
    ("BOM", "Chhatrapati Shivaji Maharaj International Airport", "Mumbai", "India", "IN", 19.0896, 72.8656, "Asia/Kolkata", &["mumbai", "bombay"]),
    ("SIN", "Singapore Changi Airport", "Singapore", "Singapore", "SG", 1.3644, 103.9915, "Asia/Singapore", &["singapore", "changi"]),
    ("HKG", "Hong Kong International Airport", "Hong Kong", "Hong Kong", "HK", 22.3080, 113.9185, "Asia/Hong_Kong", &["hong kong", "chek lap kok"]),
    ("SYD", "Sydney Kingsford Smith Airport", "Sydney", "Australia", "AU", -33.9399, 151.1753, "Australia/Sydney", &["sydney"]),
];

#[derive(Debug, Clone, Copy)]
enum Entry {
    Metro(usize),
    Airport(usize),
}

#[derive(Debug)]
pub struct FallbackTable {
    metro_codes: HashMap<&'static str, usize>,
    airport_codes: HashMap<&'static str, usize>,
    names: HashMap<String, Entry>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackTable {
    pub fn new() -> Self {
        let metro_codes = METROS.iter().enumerate().map(|(i, m)| (m.0, i)).collect();
        let airport_codes = AIRPORTS.iter().enumerate().map(|(i, a)| (a.0, i)).collect();

        let mut names = HashMap::new();
        // airport cities first so metro names overwrite them
        for (i, airport) in AIRPORTS.iter().enumerate() {
            names.insert(normalize_query(airport.2), Entry::Airport(i));
        }
        for (i, metro) in METROS.iter().enumerate() {
            names.insert(normalize_query(metro.1), Entry::Metro(i));
            for alias in metro.8 {
                names.insert(normalize_query(alias), Entry::Metro(i));
            }
        }
        // airport-specific aliases ("heathrow") name one airport, never the metro
        for (i, airport) in AIRPORTS.iter().enumerate() {
            for alias in airport.8 {
                names.entry(normalize_query(alias)).or_insert(Entry::Airport(i));
            }
        }

        Self {
            metro_codes,
            airport_codes,
            names,
        }
    }

    pub fn len(&self) -> usize {
        METROS.len() + AIRPORTS.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `query` may be raw user text; it is normalized here.
    pub fn lookup(&self, query: &str, prefer_metro: bool) -> Option<LookupResult> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return None;
        }

        if let Some(code) = as_iata_code(&normalized) {
            let metro = self.metro_codes.get(code.as_str()).copied();
            let airport = self.airport_codes.get(code.as_str()).copied();
            let hit = match (metro, airport) {
                (Some(m), Some(a)) => Some(if prefer_metro {
                    Entry::Metro(m)
                } else {
                    Entry::Airport(a)
                }),
                (Some(m), None) => Some(Entry::Metro(m)),
                (None, Some(a)) => Some(Entry::Airport(a)),
                (None, None) => None,
            };
            if let Some(hit) = hit {
                return Some(self.build(hit, 1.0));
            }
        }

        match self.names.get(&normalized).copied()? {
            Entry::Metro(m) if !prefer_metro => {
                let primary = METROS[m].7.first().copied().unwrap_or(METROS[m].0);
                let entry = self
                    .airport_codes
                    .get(primary)
                    .map(|&a| Entry::Airport(a))
                    .unwrap_or(Entry::Metro(m));
                Some(self.build(entry, NAME_CONFIDENCE))
            }
            entry => Some(self.build(entry, NAME_CONFIDENCE)),
        }
    }

    fn build(&self, entry: Entry, confidence: f64) -> LookupResult {
        match entry {
            Entry::Metro(i) => {
                let (code, name, country, cc, lat, lon, tz, members, _) = METROS[i];
                LookupResult {
                    kind: ResultKind::Metro,
                    iata_code: code.to_string(),
                    name: name.to_string(),
                    city: name.to_string(),
                    country: country.to_string(),
                    country_code: cc.to_string(),
                    latitude: Some(lat),
                    longitude: Some(lon),
                    timezone: Some(tz.to_string()),
                    airport_codes: members.iter().map(|c| c.to_string()).collect(),
                    passenger_count: None,
                    confidence,
                    alternatives: Vec::new(),
                    source: Source::Fallback,
                    origin: Source::Fallback,
                }
            }
            Entry::Airport(i) => {
                let (code, name, city, country, cc, lat, lon, tz, _) = AIRPORTS[i];
                LookupResult {
                    kind: ResultKind::Airport,
                    iata_code: code.to_string(),
                    name: name.to_string(),
                    city: city.to_string(),
                    country: country.to_string(),
                    country_code: cc.to_string(),
                    latitude: Some(lat),
                    longitude: Some(lon),
                    timezone: Some(tz.to_string()),
                    airport_codes: Vec::new(),
                    passenger_count: None,
                    confidence,
                    alternatives: Vec::new(),
                    source: Source::Fallback,
                    origin: Source::Fallback,
                }
            }
        }
    }
}

/// Lookup against the built-in table.
pub fn fallback_lookup(query: &str, prefer_metro: bool) -> Option<LookupResult> {
    FallbackTable::new().lookup(query, prefer_metro)
}
