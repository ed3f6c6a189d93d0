//! SMS message templates for OSCA notifications.
//!
//! Every template is a pure function of its payload. Output always goes
//! through [`truncate_message`], so no rendered body exceeds
//! [`MAX_MESSAGE_LENGTH`] characters.

use serde::{Deserialize, Serialize};

/// Hard cap on a rendered message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 1600;

/// Characters per billed SMS segment.
pub const SEGMENT_LENGTH: usize = 160;

const ELLIPSIS: &str = "...";

const SIGNATURE: &str = "- Office of Senior Citizens Affairs (OSCA)";

/// Character count and billing estimate for a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub length: usize,
    pub sms_count: usize,
    pub is_valid: bool,
}

/// Report length and segment count. Informational only; nothing splits on it.
pub fn message_info(message: &str) -> MessageInfo {
    let length = message.chars().count();
    MessageInfo {
        length,
        sms_count: length.div_ceil(SEGMENT_LENGTH),
        is_valid: length > 0 && length <= MAX_MESSAGE_LENGTH,
    }
}

/// Cut a message to [`MAX_MESSAGE_LENGTH`] characters, ending in `...` when cut.
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LENGTH {
        return message.to_string();
    }
    let keep = MAX_MESSAGE_LENGTH - ELLIPSIS.len();
    let mut out: String = message.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

// ── Payloads ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementPayload {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPayload {
    pub senior_name: String,
    pub purpose: String,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenefitPayload {
    pub senior_name: String,
    pub benefit_name: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub claim_date: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPayload {
    pub senior_name: String,
    pub document_type: String,
    #[serde(default)]
    pub pickup_location: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BirthdayPayload {
    pub senior_name: String,
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmergencyPayload {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
}

// ── Layout helper ───────────────────────────────────────────────────────

/// Line-oriented builder; optional lines vanish when their value is absent or blank.
struct Layout {
    lines: Vec<String>,
}

impl Layout {
    fn new(header: &str) -> Self {
        Self {
            lines: vec![header.to_string()],
        }
    }

    fn line(mut self, text: impl Into<String>) -> Self {
        self.lines.push(text.into());
        self
    }

    fn blank(self) -> Self {
        self.line(String::new())
    }

    fn field(self, label: &str, value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => self.line(format!("{label}: {v}")),
            None => self,
        }
    }

    fn finish(mut self) -> String {
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        let body = self.blank().line(SIGNATURE).lines.join("\n");
        truncate_message(&body)
    }
}

// ── Templates ───────────────────────────────────────────────────────────

pub fn announcement(p: &AnnouncementPayload) -> String {
    Layout::new("OSCA ANNOUNCEMENT")
        .blank()
        .line(p.title.as_str())
        .blank()
        .line(p.description.as_str())
        .blank()
        .field("Location", p.location.as_deref())
        .field("Date", p.date.as_deref())
        .finish()
}

pub fn appointment_reminder(p: &AppointmentPayload) -> String {
    Layout::new("APPOINTMENT REMINDER")
        .blank()
        .line(format!("Good day, {}!", p.senior_name))
        .line(format!(
            "This is a reminder of your appointment for {}.",
            p.purpose
        ))
        .blank()
        .field("Date", Some(p.date.as_str()))
        .field("Time", p.time.as_deref())
        .field("Location", p.location.as_deref())
        .blank()
        .line("Please bring your OSCA ID. Thank you.")
        .finish()
}

pub fn appointment_confirmation(p: &AppointmentPayload) -> String {
    Layout::new("APPOINTMENT CONFIRMED")
        .blank()
        .line(format!("Good day, {}!", p.senior_name))
        .line(format!(
            "Your appointment for {} has been confirmed.",
            p.purpose
        ))
        .blank()
        .field("Date", Some(p.date.as_str()))
        .field("Time", p.time.as_deref())
        .field("Location", p.location.as_deref())
        .finish()
}

pub fn benefit_approval(p: &BenefitPayload) -> String {
    Layout::new("BENEFIT APPROVED")
        .blank()
        .line(format!("Good news, {}!", p.senior_name))
        .line(format!(
            "Your application for {} has been approved.",
            p.benefit_name
        ))
        .blank()
        .field("Amount", p.amount.as_deref())
        .field("Claim date", p.claim_date.as_deref())
        .blank()
        .line("Please bring a valid ID when claiming.")
        .finish()
}

pub fn benefit_rejection(p: &BenefitPayload) -> String {
    Layout::new("BENEFIT APPLICATION UPDATE")
        .blank()
        .line(format!("Good day, {}.", p.senior_name))
        .line(format!(
            "We regret to inform you that your application for {} was not approved.",
            p.benefit_name
        ))
        .blank()
        .field("Reason", p.reason.as_deref())
        .blank()
        .line("For questions, please visit your barangay OSCA office.")
        .finish()
}

pub fn document_ready(p: &DocumentPayload) -> String {
    Layout::new("DOCUMENT READY")
        .blank()
        .line(format!("Good day, {}!", p.senior_name))
        .line(format!(
            "Your requested {} is now ready for pickup.",
            p.document_type
        ))
        .blank()
        .field("Pickup location", p.pickup_location.as_deref())
        .blank()
        .line("Please bring a valid ID.")
        .finish()
}

pub fn document_rejection(p: &DocumentPayload) -> String {
    Layout::new("DOCUMENT REQUEST UPDATE")
        .blank()
        .line(format!("Good day, {}.", p.senior_name))
        .line(format!(
            "Your request for {} could not be processed.",
            p.document_type
        ))
        .blank()
        .field("Reason", p.reason.as_deref())
        .blank()
        .line("You may submit a new request at your barangay OSCA office.")
        .finish()
}

pub fn birthday_greeting(p: &BirthdayPayload) -> String {
    let greeting = match p.age {
        Some(age) => format!("Happy {} birthday, {}!", ordinal(age), p.senior_name),
        None => format!("Happy birthday, {}!", p.senior_name),
    };
    Layout::new("HAPPY BIRTHDAY")
        .blank()
        .line(greeting)
        .line("Wishing you good health, joy and peace on your special day.")
        .finish()
}

pub fn emergency_alert(p: &EmergencyPayload) -> String {
    Layout::new("EMERGENCY ALERT")
        .blank()
        .line(p.title.as_str())
        .blank()
        .line(p.message.as_str())
        .blank()
        .field("Instructions", p.instructions.as_deref())
        .field("Hotline", p.contact_number.as_deref())
        .finish()
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
