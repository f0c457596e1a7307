use composer::actions::builtin::DryRunExecutor;
use composer::actions::http::ChatCompletionExecutor;
use composer::actions::{ExecutionRequest, Executor};
use composer::compiler::compile;
use composer::config::ExecutionConfig;
use composer::dsl::builder::NodeBuilder;
use composer::error::ExecutionError;

#[tokio::test]
async fn test_dry_run_returns_compiled_document() {
    let tree = NodeBuilder::new("a")
        .content("Summarize {{topic}}")
        .literal("topic", "the meeting")
        .build();
    let request = ExecutionRequest::from_compiled(&compile(&tree), "Be concise.");

    let response = DryRunExecutor.execute(request).await.expect("Dry run failed");

    assert_eq!(response, "Summarize the meeting");
}

#[test]
fn test_chat_executor_requires_api_key() {
    let config = ExecutionConfig {
        api_key_env: "COMPOSER_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
        ..ExecutionConfig::default()
    };

    let err = ChatCompletionExecutor::from_config(&config).unwrap_err();

    assert_eq!(
        err,
        ExecutionError::MissingApiKey("COMPOSER_TEST_KEY_THAT_IS_NEVER_SET".to_string())
    );
}

#[tokio::test]
#[ignore] // Needs network access and OPENAI_API_KEY
async fn test_chat_completion_round_trip() {
    let executor = ChatCompletionExecutor::from_config(&ExecutionConfig::default())
        .expect("OPENAI_API_KEY must be set");
    let request = ExecutionRequest::new("Reply with the single word: pong", "ping");

    let response = executor.execute(request).await.expect("Execution failed");

    assert!(!response.is_empty());
}
