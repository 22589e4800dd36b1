//! Single-line address rendering for the pickup and delivery legs.

use super::entities::{Address, StoreOrigin};

/// Resolves a country code to its display name.
pub trait CountryNames: Send + Sync {
    fn country_name(&self, code: &str) -> Option<String>;
}

/// English names for the countries a Belgian shop usually ships from or to.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinCountryNames;

impl CountryNames for BuiltinCountryNames {
    fn country_name(&self, code: &str) -> Option<String> {
        let name = match code.trim().to_ascii_uppercase().as_str() {
            "BE" => "Belgium",
            "NL" => "Netherlands",
            "LU" => "Luxembourg",
            "FR" => "France",
            "DE" => "Germany",
            "GB" => "United Kingdom",
            "IE" => "Ireland",
            "ES" => "Spain",
            "IT" => "Italy",
            "AT" => "Austria",
            "CH" => "Switzerland",
            "DK" => "Denmark",
            "PL" => "Poland",
            "PT" => "Portugal",
            "US" => "United States",
            _ => return None,
        };
        Some(name.to_string())
    }
}

/// Accumulates present components, each paired with the separator that
/// follows it when another component comes after.
#[derive(Default)]
struct AddressLine {
    parts: Vec<(String, &'static str)>,
}

impl AddressLine {
    fn push(&mut self, value: Option<&str>, separator: &'static str) -> &mut Self {
        if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
            self.parts.push((value.to_string(), separator));
        }
        self
    }

    fn finish(&self) -> String {
        let mut line = String::new();
        let last = self.parts.len().saturating_sub(1);
        for (idx, (value, separator)) in self.parts.iter().enumerate() {
            line.push_str(value);
            if idx < last {
                line.push_str(separator);
            }
        }
        line
    }
}

fn country(countries: &dyn CountryNames, code: Option<&str>) -> Option<String> {
    code.filter(|code| !code.trim().is_empty())
        .and_then(|code| countries.country_name(code))
}

/// `street, postcode city, region, country`
pub fn format_delivery_address(address: &Address, countries: &dyn CountryNames) -> String {
    let street = address.street_full();
    let country = country(countries, address.country_id.as_deref());
    AddressLine::default()
        .push(Some(street.as_str()), ", ")
        .push(address.postcode.as_deref(), " ")
        .push(address.city.as_deref(), ", ")
        .push(address.region.as_deref(), ", ")
        .push(country.as_deref(), "")
        .finish()
}

/// `line1 line2, postcode city, country`. The origin carries no region.
pub fn format_pickup_address(origin: &StoreOrigin, countries: &dyn CountryNames) -> String {
    let street = AddressLine::default()
        .push(origin.street_line1.as_deref(), " ")
        .push(origin.street_line2.as_deref(), "")
        .finish();
    let country = country(countries, origin.country_id.as_deref());
    AddressLine::default()
        .push(Some(street.as_str()), ", ")
        .push(origin.postcode.as_deref(), " ")
        .push(origin.city.as_deref(), ", ")
        .push(country.as_deref(), "")
        .finish()
}
