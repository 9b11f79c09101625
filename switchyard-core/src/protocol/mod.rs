//! Protocol module for the unified request schema
//!
//! This module defines the canonical in-memory request form used between
//! scenario selection and provider dispatch. These structures are designed to be:
//! - Provider-agnostic
//! - Lossless for fields they do not model
//! - Type-safe and serializable

pub mod types;

pub use types::{
    ContentPart, FunctionCall, FunctionChoice, FunctionDefinition, ImageUrl, Message,
    MessageBuilder, MessageContent, MessageRole, StreamOptions, ToolCall, ToolChoice,
    ToolDefinition, UnifiedChatRequest,
};
