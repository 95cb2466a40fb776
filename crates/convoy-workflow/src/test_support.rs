//! Test doubles shared by this crate's unit tests

use async_trait::async_trait;
use convoy_core::Result;
use convoy_runtime::{AgentRuntime, GenerationRequest, ReplyGenerator};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Generator {}

    #[async_trait]
    impl ReplyGenerator for Generator {
        async fn generate(&self, request: GenerationRequest) -> Result<Option<String>>;
    }
}

/// Generator that fails the test if any agent asks it for a reply
pub fn never_called() -> MockGenerator {
    let mut generator = MockGenerator::new();
    generator.expect_generate().never();
    generator
}

/// Runtime without code execution whose generator must never be called
pub fn silent_runtime() -> AgentRuntime {
    runtime_with(never_called())
}

/// Runtime without code execution using `generator`
pub fn runtime_with(generator: MockGenerator) -> AgentRuntime {
    AgentRuntime::builder()
        .generator(Arc::new(generator))
        .without_code_execution()
        .build()
}
