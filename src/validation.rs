// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request validation.
//!
//! One function per request body. Each returns every violated rule so the
//! caller can report them together; an empty list means the input is valid.

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidateEmail;

use crate::metrics::projection::current_age;
use crate::models::{CreateClientRequest, LoginRequest, RefreshTokenRequest, RegisterRequest};

pub const MIN_CLIENT_AGE: i32 = 18;
pub const MAX_CLIENT_AGE: i32 = 120;

/// Largest accepted difference between reported and calculated age.
pub const AGE_TOLERANCE_YEARS: i32 = 1;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    #[schema(value_type = Object, nullable)]
    pub rejected_value: serde_json::Value,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, rejected_value: impl Into<serde_json::Value>, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            rejected_value: rejected_value.into(),
            message: message.into(),
        }
    }
}

/// Collects violations for one request body.
#[derive(Debug, Default)]
struct Violations(Vec<FieldError>);

impl Violations {
    fn push(&mut self, field: &str, value: impl Into<serde_json::Value>, message: &str) {
        self.0.push(FieldError::new(field, value, message));
    }

    /// Not blank, then length within `min..=max` characters.
    fn text(&mut self, field: &str, value: &str, min: usize, max: usize, blank_msg: &str, len_msg: &str) {
        if value.trim().is_empty() {
            self.push(field, value, blank_msg);
            return;
        }
        let len = value.chars().count();
        if len < min || len > max {
            self.push(field, value, len_msg);
        }
    }

    /// Rejected value is masked for secrets.
    fn secret(&mut self, field: &str, value: &str, min: usize, blank_msg: &str, len_msg: &str) {
        if value.trim().is_empty() {
            self.push(field, serde_json::Value::Null, blank_msg);
        } else if value.chars().count() < min {
            self.push(field, serde_json::Value::Null, len_msg);
        }
    }
}

pub fn validate_login(request: &LoginRequest) -> Vec<FieldError> {
    let mut v = Violations::default();
    v.text(
        "identifier",
        &request.identifier,
        3,
        100,
        "Username or email is required",
        "Identifier must be between 3 and 100 characters",
    );
    v.secret(
        "password",
        &request.password,
        8,
        "Password is required",
        "Password must be at least 8 characters",
    );
    v.0
}

pub fn validate_register(request: &RegisterRequest) -> Vec<FieldError> {
    let mut v = Violations::default();
    v.text(
        "username",
        &request.username,
        3,
        50,
        "Username is required",
        "Username must be between 3 and 50 characters",
    );

    if request.email.trim().is_empty() {
        v.push("email", request.email.as_str(), "Email is required");
    } else if !request.email.validate_email() {
        v.push("email", request.email.as_str(), "Email must be valid");
    }

    v.secret(
        "password",
        &request.password,
        6,
        "Password is required",
        "Password must be at least 6 characters",
    );

    if request.confirm_password.trim().is_empty() {
        v.push("confirmPassword", serde_json::Value::Null, "Password confirmation is required");
    } else if request.confirm_password != request.password {
        v.push("confirmPassword", serde_json::Value::Null, "Passwords do not match");
    }

    if request.first_name.trim().is_empty() {
        v.push("firstName", request.first_name.as_str(), "First name is required");
    }
    if request.last_name.trim().is_empty() {
        v.push("lastName", request.last_name.as_str(), "Last name is required");
    }
    v.0
}

pub fn validate_refresh(request: &RefreshTokenRequest) -> Vec<FieldError> {
    let mut v = Violations::default();
    if request.refresh_token.trim().is_empty() {
        v.push("refreshToken", serde_json::Value::Null, "Refresh token is required");
    }
    v.0
}

/// Field rules for a new client. `today` decides what "in the past" means.
pub fn validate_client(request: &CreateClientRequest, today: NaiveDate) -> Vec<FieldError> {
    let mut v = Violations::default();
    v.text(
        "name",
        &request.name,
        2,
        100,
        "Name is required",
        "Name must be between 2 and 100 characters",
    );
    v.text(
        "lastName",
        &request.last_name,
        2,
        100,
        "Last name is required",
        "Last name must be between 2 and 100 characters",
    );

    match request.age {
        None => v.push("age", serde_json::Value::Null, "Age is required"),
        Some(age) if age < MIN_CLIENT_AGE => v.push("age", age, "Age must be at least 18"),
        Some(age) if age > MAX_CLIENT_AGE => v.push("age", age, "Age must be at most 120"),
        Some(_) => {}
    }

    match request.birth_date {
        None => v.push("birthDate", serde_json::Value::Null, "Birth date is required"),
        Some(birth) if birth >= today => v.push("birthDate", birth.to_string(), "Birth date must be in the past"),
        Some(_) => {}
    }
    v.0
}

/// Reported age disagrees with the birth date by more than a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Provided age ({provided}) is not consistent with birth date. Calculated age: {calculated}")]
pub struct AgeMismatch {
    pub provided: i32,
    pub calculated: i32,
}

impl AgeMismatch {
    pub fn field_error(&self) -> FieldError {
        FieldError::new("age", self.provided, self.to_string())
    }
}

/// Accept `age` if it is within one year of the age implied by `birth_date`.
pub fn check_age_consistency(age: i32, birth_date: NaiveDate, today: NaiveDate) -> Result<(), AgeMismatch> {
    let calculated = current_age(birth_date, today);
    if (age - calculated).abs() > AGE_TOLERANCE_YEARS {
        return Err(AgeMismatch {
            provided: age,
            calculated,
        });
    }
    Ok(())
}
