pub mod price_history_queries;
