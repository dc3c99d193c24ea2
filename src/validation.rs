// Field validation for the booking form

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use crate::form::Applicant;
use crate::selection::TimeSlot;

/// Message shown under the email field when submit-time validation fails.
pub const EMAIL_FORMAT_MESSAGE: &str = "Please use correct formatting.\nExample: address@email.com";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

/// Checks that `email` has the shape `local@domain.tld`.
///
/// Each of the three parts must be non-empty and free of whitespace and `@`.
/// Nothing is trimmed or lowercased first. This is a syntactic sanity check
/// only and accepts plenty of addresses RFC 5322 would reject (and rejects a
/// few quoted forms it would accept).
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Returns true when every gating field of the form holds a value.
///
/// Email syntax is not checked here, only presence; the submit path runs
/// [`is_valid_email`] separately. Age is not a gating field because it
/// always carries a value.
pub fn is_ready(
    applicant: &Applicant,
    file_name: Option<&str>,
    date: Option<NaiveDate>,
    time: Option<TimeSlot>,
) -> bool {
    !applicant.first_name.is_empty()
        && !applicant.last_name.is_empty()
        && !applicant.email.is_empty()
        && file_name.map_or(false, |name| !name.is_empty())
        && date.is_some()
        && time.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("a@b.c" ; "minimal address")]
    #[test_case("address@email.com" ; "typical address")]
    #[test_case("first.last@sub.domain.org" ; "dotted local and domain")]
    #[test_case("a@b.c.d" ; "several dots after at")]
    #[test_case("UPPER@Case.COM" ; "case is not normalised")]
    fn test_accepts_well_formed_email(email: &str) {
        assert!(is_valid_email(email));
    }

    #[test_case("" ; "empty")]
    #[test_case("plainaddress" ; "no at sign")]
    #[test_case("a@b" ; "no dot after at")]
    #[test_case("a.b@c" ; "dot only before at")]
    #[test_case("@b.c" ; "empty local part")]
    #[test_case("a@.c" ; "empty domain")]
    #[test_case("a@b." ; "empty tld")]
    #[test_case("a@@b.c" ; "double at")]
    #[test_case("a@b@c.d" ; "at inside domain")]
    #[test_case("a b@c.d" ; "space in local part")]
    #[test_case(" a@b.c" ; "leading space is not trimmed")]
    #[test_case("a@b.c " ; "trailing space is not trimmed")]
    fn test_rejects_malformed_email(email: &str) {
        assert!(!is_valid_email(email));
    }

    #[test]
    fn test_strings_without_at_are_rejected() {
        for email in ["abc", "abc.def", "abc.def.ghi", "x.y"] {
            assert!(!is_valid_email(email), "{email} should be rejected");
        }
    }

    #[test]
    fn test_is_ready_over_every_field_combination() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 12).unwrap();

        // Six gating fields, each present or absent.
        for mask in 0u8..64 {
            let present = |bit: u8| mask & (1 << bit) != 0;
            let applicant = Applicant {
                first_name: if present(0) { "Jan".into() } else { String::new() },
                last_name: if present(1) { "Kowalski".into() } else { String::new() },
                email: if present(2) { "jan@example.pl".into() } else { String::new() },
                age: 30,
            };
            let file_name = if present(3) { Some("photo.png") } else { None };
            let picked_date = if present(4) { Some(date) } else { None };
            let time = if present(5) { Some(TimeSlot::T1400) } else { None };

            assert_eq!(
                is_ready(&applicant, file_name, picked_date, time),
                mask == 63,
                "unexpected readiness for mask {mask:06b}"
            );
        }
    }

    #[test]
    fn test_is_ready_treats_empty_file_name_as_missing() {
        let applicant = Applicant {
            first_name: "Jan".into(),
            last_name: "Kowalski".into(),
            email: "jan@example.pl".into(),
            age: 30,
        };
        let date = NaiveDate::from_ymd_opt(2024, 11, 12);

        assert!(!is_ready(&applicant, Some(""), date, Some(TimeSlot::T1200)));
        assert!(is_ready(&applicant, Some("a.jpg"), date, Some(TimeSlot::T1200)));
    }

    #[test]
    fn test_is_ready_does_not_check_email_syntax() {
        let applicant = Applicant {
            first_name: "Jan".into(),
            last_name: "Kowalski".into(),
            email: "not-an-email".into(),
            age: 30,
        };
        let date = NaiveDate::from_ymd_opt(2024, 11, 12);

        assert!(is_ready(&applicant, Some("a.jpg"), date, Some(TimeSlot::T2000)));
    }
}
