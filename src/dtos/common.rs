// dtos/common.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQueryDto {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQueryDto {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_bounds() {
        let q = PageQueryDto {
            limit: Some(1000),
            offset: Some(-5),
        };
        assert_eq!(q.limit(), 100);
        assert_eq!(q.offset(), 0);

        let q = PageQueryDto {
            limit: None,
            offset: None,
        };
        assert_eq!(q.limit(), 20);
        assert_eq!(q.offset(), 0);
    }
}
