//! Trip form, booking draft assembly and ticket issuance.

use crate::location::LocationCandidate;
use crate::parks::Park;
use crate::selection::LocationSelection;
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pick-up slots offered by every park.
pub const PICKUP_TIMES: [&str; 5] = ["6:00am", "9:00am", "12:00pm", "3:00pm", "6:00pm"];

/// Fare when a route is not in the table, in NGN.
pub const DEFAULT_FARE: u64 = 40_000;

const FARES: &[(&str, &str, u64)] = &[
    ("ajah", "aba", 40_000),
    ("ikeja", "aba", 42_000),
    ("yaba", "aba", 41_000),
];

const TICKET_CODE_LEN: usize = 6;
const TICKET_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Per-ticket fare for a route. Lookup ignores case and surrounding spaces.
pub fn ticket_price(from: &str, to: &str) -> u64 {
    let (from, to) = (from.trim().to_lowercase(), to.trim().to_lowercase());
    FARES
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map_or(DEFAULT_FARE, |(_, _, price)| *price)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForWho {
    #[default]
    ForMe,
    ForOthers,
    ForMeAndOthers,
}

impl FromStr for ForWho {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "me" | "for-me" => Ok(Self::ForMe),
            "others" | "for-others" => Ok(Self::ForOthers),
            "me-and-others" | "for-me-and-others" => Ok(Self::ForMeAndOthers),
            other => Err(format!(
                "unknown passenger option '{}' (expected me, others or me-and-others)",
                other
            )),
        }
    }
}

impl fmt::Display for ForWho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForMe => write!(f, "For me"),
            Self::ForOthers => write!(f, "For others"),
            Self::ForMeAndOthers => write!(f, "For me and others"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

/// The form field a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Destination,
    From,
    Park,
    Date,
    Time,
    Tickets,
    Children,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: FormField,
    pub message: String,
}

impl ValidationError {
    fn new(field: FormField, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

fn default_tickets() -> u32 {
    1
}

/// Non-location fields of the booking form.
///
/// The setters keep `children <= tickets` on every change. A form read
/// from outside (JSON) is checked again at [`assemble`] time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripForm {
    #[serde(default)]
    destination: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default = "default_tickets")]
    tickets: u32,
    #[serde(default)]
    children: u32,
    #[serde(default)]
    for_who: ForWho,
}

impl Default for TripForm {
    fn default() -> Self {
        Self {
            destination: String::new(),
            date: None,
            time: None,
            tickets: 1,
            children: 0,
            for_who: ForWho::ForMe,
        }
    }
}

impl TripForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn tickets(&self) -> u32 {
        self.tickets
    }

    pub fn children(&self) -> u32 {
        self.children
    }

    pub fn set_destination(&mut self, destination: &str) {
        self.destination = destination.to_string();
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
    }

    pub fn set_time(&mut self, time: Option<&str>) {
        self.time = time.map(str::to_string);
    }

    pub fn set_for_who(&mut self, for_who: ForWho) {
        self.for_who = for_who;
    }

    /// Lowering the ticket count pulls the children count down with it.
    pub fn set_ticket_count(&mut self, tickets: u32) -> Result<(), ValidationError> {
        if tickets == 0 {
            return Err(ValidationError::new(FormField::Tickets, "At least one ticket is required"));
        }
        self.tickets = tickets;
        self.children = self.children.min(tickets);
        Ok(())
    }

    pub fn set_children_count(&mut self, children: u32) -> Result<(), ValidationError> {
        if children > self.tickets {
            return Err(children_error());
        }
        self.children = children;
        Ok(())
    }
}

fn children_error() -> ValidationError {
    ValidationError::new(FormField::Children, "Only one child per ticket booked is allowed")
}

/// The assembled booking, as stored under `bookingData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub destination: String,
    pub from: String,
    pub from_details: Option<LocationCandidate>,
    pub selected_park: Option<Park>,
    pub date: NaiveDate,
    pub time: String,
    pub tickets: u32,
    pub children: u32,
    #[serde(default)]
    pub for_who: ForWho,
    pub price_per_ticket: u64,
    pub total_price: u64,
    #[serde(default)]
    pub ticket_code: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
}

impl BookingDraft {
    /// The ticket code, generated on first use. Returns whether a new
    /// code was issued (so the caller knows to persist).
    pub fn ensure_ticket_code<R: Rng>(&mut self, rng: &mut R) -> bool {
        let valid = self.ticket_code.as_deref().is_some_and(is_ticket_code);
        if !valid {
            self.ticket_code = Some(generate_ticket_code(rng));
        }
        !valid
    }

    /// Simulated payment.
    pub fn mark_paid(&mut self) {
        self.payment_status = PaymentStatus::Paid;
    }
}

pub fn generate_ticket_code<R: Rng>(rng: &mut R) -> String {
    (0..TICKET_CODE_LEN)
        .map(|_| TICKET_CODE_CHARS[rng.gen_range(0..TICKET_CODE_CHARS.len())] as char)
        .collect()
}

fn is_ticket_code(code: &str) -> bool {
    code.len() == TICKET_CODE_LEN && code.bytes().all(|b| TICKET_CODE_CHARS.contains(&b))
}

/// Validate the form against the current location state and build the
/// draft. The first failing field wins.
pub fn assemble(
    form: &TripForm,
    selection: &LocationSelection,
    today: NaiveDate,
) -> Result<BookingDraft, ValidationError> {
    let destination = form.destination.trim();
    if destination.chars().count() < 2 {
        return Err(ValidationError::new(FormField::Destination, "Destination city is required"));
    }

    let (from, from_details) = match (selection.resolved(), selection.typed_city()) {
        (Some(resolved), _) => (resolved.city.clone(), Some(resolved.clone())),
        (None, Some(typed)) => (typed.to_string(), None),
        (None, None) => {
            return Err(ValidationError::new(FormField::From, "Departure city is required"))
        }
    };

    let Some(park) = selection.selected_park() else {
        return Err(ValidationError::new(FormField::Park, "Please select a take-off park"));
    };

    let date = match form.date {
        None => return Err(ValidationError::new(FormField::Date, "Travel date is required")),
        Some(d) if d < today => {
            return Err(ValidationError::new(FormField::Date, "Travel date cannot be in the past"))
        }
        Some(d) => d,
    };

    let time = match form.time.as_deref().map(str::trim) {
        None | Some("") => {
            return Err(ValidationError::new(FormField::Time, "Pick-up time is required"))
        }
        Some(t) => match PICKUP_TIMES.iter().find(|slot| slot.eq_ignore_ascii_case(t)) {
            Some(slot) => slot.to_string(),
            None => {
                return Err(ValidationError::new(
                    FormField::Time,
                    format!("Pick-up time must be one of {}", PICKUP_TIMES.join(", ")),
                ))
            }
        },
    };

    if form.tickets == 0 {
        return Err(ValidationError::new(FormField::Tickets, "At least one ticket is required"));
    }
    if form.children > form.tickets {
        return Err(children_error());
    }

    let price_per_ticket = ticket_price(&from, destination);
    Ok(BookingDraft {
        destination: destination.to_string(),
        from,
        from_details,
        selected_park: Some(park.clone()),
        date,
        time,
        tickets: form.tickets,
        children: form.children,
        for_who: form.for_who,
        price_per_ticket,
        total_price: price_per_ticket * u64::from(form.tickets),
        ticket_code: None,
        payment_status: PaymentStatus::Pending,
    })
}
