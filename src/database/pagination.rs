use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// 1-based page number plus page size, as sent by clients.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, i64::MAX / MAX_PAGE_SIZE),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
    pub page_list: Vec<(String, i64)>,
    pub message: Option<String>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows(total_rows);
        }

        let page_size = page_size.max(1);
        let next_offset = (current_offset + page_size < total_rows).then(|| current_offset + page_size);
        let prev_offset = (current_offset > 0).then(|| (current_offset - page_size).max(0));

        let page_count = (total_rows + page_size - 1) / page_size;
        let current_page = current_offset / page_size;

        let page_list = (0..page_count)
            .map(|n| {
                let page = if n == current_page {
                    String::from("...")
                } else {
                    format!("{}", n + 1)
                };

                (page, n * page_size)
            })
            .collect();

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
            page_list,
            message: Some(format!(
                "{} - {} / {}",
                current_offset + 1,
                (current_offset + page_size).min(total_rows),
                total_rows
            )),
        }
    }

    pub fn no_rows(total_rows: i64) -> Self {
        Self {
            rows: vec![],
            total_rows,
            next_offset: None,
            prev_offset: None,
            page_list: vec![(String::from("1"), 0)],
            message: Some(String::from("No results")),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PageContext<U> {
        PageContext {
            rows: self.rows.into_iter().map(f).collect(),
            total_rows: self.total_rows,
            next_offset: self.next_offset,
            prev_offset: self.prev_offset,
            page_list: self.page_list,
            message: self.message,
        }
    }
}
