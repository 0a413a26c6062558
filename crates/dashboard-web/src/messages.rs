//! User-facing Korean messages built from query notices and outcomes

use dashboard_stock::{QueryNotice, QueryOutcome};
use serde::Serialize;
use std::fmt::Display;

pub const EMPTY_INPUT: &str = "조회할 회사 이름을 입력하세요.";
pub const NO_DATA: &str = "조회된 데이터가 없습니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// One message shown above the results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

pub fn notice(notice: &QueryNotice) -> Message {
    match notice {
        QueryNotice::ListingUnavailable { reason } => {
            Message::error(format!("상장사 명단을 불러오는 데 실패했습니다: {reason}"))
        }
        QueryNotice::CompanyNotFound { token } => {
            Message::warning(format!("'{token}'을(를) 찾을 수 없습니다."))
        }
    }
}

pub fn failure(error: &impl Display) -> String {
    format!("오류가 발생했습니다: {error}")
}

/// Messages for `outcome`, notices first in the order they were raised
pub fn for_outcome(outcome: &QueryOutcome) -> Vec<Message> {
    match outcome {
        QueryOutcome::EmptyInput => vec![Message::warning(EMPTY_INPUT)],
        QueryOutcome::NoData { notices } => notices
            .iter()
            .map(notice)
            .chain(std::iter::once(Message::info(NO_DATA)))
            .collect(),
        QueryOutcome::Data { notices, .. } => notices.iter().map(notice).collect(),
    }
}
