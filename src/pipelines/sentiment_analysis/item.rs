use std::fmt::Debug;

/// A trait for items that can be used for sentiment analysis
pub trait Item: Send + Sync + Clone + Debug {
    /// Returns the input text for the item
    fn input(&self) -> &str;

    /// Returns `true` for positive sentiment
    fn label(&self) -> bool;
}
