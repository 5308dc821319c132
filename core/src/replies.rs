//! User-facing reply texts.
//!
//! The product speaks Russian; everything a requester reads is built here so
//! transports only move strings around.

use wiseacre_store::StoreError;
use wiseacre_types::{AuthOutcome, DateParseError};

pub const WELCOME: &str = "🎓 На связи Умник!\n\n\
Этот бот создан специально для студентов вашего университета, чтобы облегчить \
повседневную академическую жизнь.\n\n\
🔐 Для доступа к функциям необходимо пройти аутентификацию.\n\n\
Пожалуйста, введите ваш номер студенческого билета:";

pub const NOT_FOUND: &str = "Номер студбилета не найден";
pub const ALREADY_CLAIMED: &str = "Этот номер уже используется";
pub const STORE_MISSING: &str = "База данных не найдена";
pub const STORE_BUSY: &str = "Сервис временно недоступен, попробуйте позже";

#[must_use]
pub fn auth_success() -> String {
    "✅ Аутентификация успешна!\n\nТеперь вам доступны все функции бота!".to_string()
}

#[must_use]
pub fn auth_failure(reason: &str) -> String {
    format!("❌ Ошибка аутентификации\n\n{reason}")
}

/// An already-claimed reply names the current holder when the record has one.
#[must_use]
pub fn for_outcome(outcome: &AuthOutcome) -> String {
    match outcome {
        AuthOutcome::Granted => auth_success(),
        AuthOutcome::NotFound => auth_failure(NOT_FOUND),
        AuthOutcome::AlreadyClaimed {
            claimant: Some(holder),
        } => auth_failure(&format!("{ALREADY_CLAIMED} ({holder})")),
        AuthOutcome::AlreadyClaimed { claimant: None } => auth_failure(ALREADY_CLAIMED),
    }
}

#[must_use]
pub fn store_unavailable(err: &StoreError) -> String {
    match err {
        StoreError::Missing { .. } => auth_failure(STORE_MISSING),
        _ => auth_failure(STORE_BUSY),
    }
}

#[must_use]
pub fn not_authenticated() -> String {
    "🔐 Для доступа к функциям необходимо пройти аутентификацию.\n\n\
     Пожалуйста, введите ваш номер студенческого билета:"
        .to_string()
}

#[must_use]
pub fn invalid_date(err: &DateParseError) -> String {
    format!(
        "❌ Не удалось разобрать дату «{}».\nИспользуйте формат {}, например {}",
        err.input.trim(),
        human_format(&err.expected),
        err.example()
    )
}

#[must_use]
pub fn signed_out() -> String {
    "👋 Вы вышли. Чтобы продолжить, введите номер студенческого билета.".to_string()
}

#[must_use]
pub fn unknown_command() -> String {
    "Пока что я понимаю только команды /start, /schedule и /logout".to_string()
}

#[must_use]
pub fn tomorrow_unavailable() -> String {
    "❌ Не удалось определить завтрашнюю дату".to_string()
}

// Render the common chrono specifiers the way users write them.
fn human_format(format: &str) -> String {
    format
        .replace("%d", "ДД")
        .replace("%m", "ММ")
        .replace("%Y", "ГГГГ")
}
