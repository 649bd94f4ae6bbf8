//! SeaORM entity models
//!
//! Database entities for InspireQA

mod feedback;
mod query_ir;
mod search_feedback;

pub use query_ir::{
    Entity as QueryIrEntity,
    Model as QueryIr,
    ActiveModel as QueryIrActiveModel,
    Column as QueryIrColumn,
};

pub use feedback::{
    Entity as FeedbackEntity,
    Model as Feedback,
    ActiveModel as FeedbackActiveModel,
    Column as FeedbackColumn,
};

pub use search_feedback::{
    Entity as SearchFeedbackEntity,
    Model as SearchFeedback,
    ActiveModel as SearchFeedbackActiveModel,
    Column as SearchFeedbackColumn,
};
