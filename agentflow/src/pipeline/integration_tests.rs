//! End-to-end tests for pipeline execution.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::{
        ResearchConfig, ReviewCriteria, ReviewerConfig, WriterConfig, WritingStyle,
    };
    use crate::core::{RunStatus, StageName, StageStatus, Task};
    use crate::errors::{ErrorKind, GenerationError, StageError};
    use crate::events::{CollectingObserver, FanoutObserver, StatsObserver};
    use crate::llm::{MockTextGenerator, TextGenerator};
    use crate::pipeline::Pipeline;
    use crate::stages::{ReviewerStage, WriterStage};
    use crate::testing::{FailingGenerator, ScriptedGenerator, StallingGenerator};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn solar_task() -> Task {
        Task::new("Summarize benefits of solar energy").with_requirements("under 200 words")
    }

    #[tokio::test]
    async fn test_full_run_completes() {
        let generator = Arc::new(ScriptedGenerator::new(["BRIEF", "DRAFT", "REVIEW: OK"]));
        let observer = Arc::new(CollectingObserver::new());
        let pipeline = Pipeline::builder()
            .generator(generator.clone())
            .observer(observer.clone())
            .build()
            .unwrap();

        let output = pipeline.run(solar_task()).await.unwrap();

        assert_eq!(output.run().status(), &RunStatus::Complete);
        assert_eq!(output.contents(), vec!["BRIEF", "DRAFT", "REVIEW: OK"]);
        assert_eq!(
            observer.status_names(),
            vec!["researching", "writing", "reviewing", "complete"]
        );
        assert_eq!(observer.results().len(), 3);
        assert_eq!(generator.call_count(), 3);

        let requests = generator.requests();
        assert!(requests[0].prompt.contains("Summarize benefits of solar energy"));
        assert!(requests[0].prompt.contains("under 200 words"));
        assert!(requests[1].prompt.contains("BRIEF"));
        assert!(requests[2].prompt.contains("DRAFT"));
    }

    #[tokio::test]
    async fn test_results_follow_stage_order() {
        let generator = Arc::new(ScriptedGenerator::new(["one", "two", "three"]));
        let pipeline = Pipeline::builder().generator(generator).build().unwrap();

        let output = pipeline.run(Task::new("topic")).await.unwrap();
        let stages: Vec<StageName> = output.run().results().iter().map(|r| r.stage).collect();

        assert_eq!(stages, StageName::ALL.to_vec());
        assert!(output
            .run()
            .results()
            .iter()
            .all(|r| r.status == StageStatus::Completed));
        assert!(output.run().finished_at().is_some());
        assert_eq!(output.research(), "one");
        assert_eq!(output.draft(), "two");
        assert_eq!(output.review(), "three");
    }

    #[tokio::test]
    async fn test_invalid_depth_fails_without_generation() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(0);
        let observer = Arc::new(CollectingObserver::new());
        let pipeline = Pipeline::builder()
            .generator(Arc::new(mock))
            .observer(observer.clone())
            .build()
            .unwrap();

        let task = solar_task().with_research(ResearchConfig::new().with_depth(11));
        let failure = pipeline.run(task).await.unwrap_err();

        assert_eq!(failure.stage, StageName::Research);
        assert_eq!(failure.kind(), ErrorKind::Config);
        assert!(matches!(failure.error, StageError::Config { .. }));
        assert_eq!(failure.run.status().failed_stage(), Some(StageName::Research));
        assert_eq!(observer.status_names(), vec!["researching", "failed"]);
    }

    #[tokio::test]
    async fn test_research_failure_stops_run() {
        let generator = Arc::new(FailingGenerator::new(GenerationError::Status {
            status: 500,
            body: "upstream".to_string(),
        }));
        let pipeline = Pipeline::builder()
            .generator(generator.clone())
            .build()
            .unwrap();

        let failure = pipeline.run(solar_task()).await.unwrap_err();

        assert_eq!(failure.stage, StageName::Research);
        assert_eq!(failure.kind(), ErrorKind::Generation);
        assert_eq!(generator.call_count(), 1);

        let results = failure.run.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, StageStatus::Failed);
        assert!(results[0].error.as_deref().unwrap_or_default().contains("500"));
    }

    #[tokio::test]
    async fn test_empty_generation_is_a_failure() {
        let generator = Arc::new(ScriptedGenerator::new(["BRIEF", "   "]));
        let pipeline = Pipeline::builder()
            .generator(generator.clone())
            .build()
            .unwrap();

        let failure = pipeline.run(solar_task()).await.unwrap_err();

        assert_eq!(failure.stage, StageName::Writer);
        assert!(matches!(
            failure.error,
            StageError::Generation {
                source: GenerationError::EmptyResponse,
                ..
            }
        ));
        assert_eq!(failure.run.result(StageName::Research).unwrap().content, "BRIEF");
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_reported_to_observer() {
        let generator = Arc::new(
            ScriptedGenerator::new(["BRIEF", "DRAFT"])
                .then_err(GenerationError::Request("connection reset".to_string())),
        );
        let observer = Arc::new(CollectingObserver::new());
        let pipeline = Pipeline::builder()
            .generator(generator)
            .observer(observer.clone())
            .build()
            .unwrap();

        let failure = pipeline.run(solar_task()).await.unwrap_err();

        assert_eq!(failure.stage, StageName::Reviewer);
        assert_eq!(
            observer.status_names(),
            vec!["researching", "writing", "reviewing", "failed"]
        );
        match observer.last_status() {
            Some(RunStatus::Failed { stage, kind, message }) => {
                assert_eq!(stage, StageName::Reviewer);
                assert_eq!(kind, ErrorKind::Generation);
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected status: {other:?}"),
        }

        let dict = failure.to_dict();
        assert_eq!(dict["completed_stages"], serde_json::json!(["research", "writer"]));
    }

    #[tokio::test]
    async fn test_cancel_during_writing() {
        let scripted = Arc::new(ScriptedGenerator::new(["BRIEF", "REVIEW"]));
        let stalling = Arc::new(StallingGenerator::new());
        let writer_generator: Arc<dyn TextGenerator> = stalling.clone();
        let observer = Arc::new(CollectingObserver::new());
        let pipeline = Pipeline::builder()
            .generator(scripted.clone())
            .writer_stage(Arc::new(WriterStage::new(writer_generator)))
            .observer(observer.clone())
            .build()
            .unwrap();
        let token = CancellationToken::new();

        let (outcome, ()) = tokio::join!(pipeline.run_with_cancellation(solar_task(), &token), async {
            stalling.started().await;
            token.cancel("user abort");
        });
        let failure = outcome.unwrap_err();

        assert_eq!(failure.stage, StageName::Writer);
        assert_eq!(failure.kind(), ErrorKind::Cancelled);
        assert!(failure.message().contains("user abort"));
        assert_eq!(scripted.call_count(), 1);
        assert_eq!(stalling.call_count(), 1);
        assert_eq!(
            observer.status_names(),
            vec!["researching", "writing", "failed"]
        );
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let generator = Arc::new(ScriptedGenerator::new(["BRIEF", "DRAFT", "REVIEW"]));
        let pipeline = Pipeline::builder()
            .generator(generator.clone())
            .build()
            .unwrap();
        let token = CancellationToken::new();
        token.cancel("shutdown");

        let failure = pipeline
            .run_with_cancellation(solar_task(), &token)
            .await
            .unwrap_err();

        assert_eq!(failure.stage, StageName::Research);
        assert_eq!(failure.kind(), ErrorKind::Cancelled);
        assert!(failure.message().contains("shutdown"));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stage_timeout_is_a_generation_failure() {
        let scripted = Arc::new(ScriptedGenerator::new(["BRIEF", "DRAFT"]));
        let stalling = Arc::new(StallingGenerator::new());
        let pipeline = Pipeline::builder()
            .generator(scripted)
            .reviewer_stage(Arc::new(ReviewerStage::new(stalling.clone())))
            .stage_timeout(Some(Duration::from_millis(50)))
            .build()
            .unwrap();

        let failure = pipeline.run(solar_task()).await.unwrap_err();

        assert_eq!(failure.stage, StageName::Reviewer);
        assert!(matches!(
            failure.error,
            StageError::Generation {
                source: GenerationError::Timeout { .. },
                ..
            }
        ));
        assert_eq!(stalling.call_count(), 1);
        assert_eq!(failure.run.results().len(), 3);
    }

    #[tokio::test]
    async fn test_markdown_report() {
        let generator = Arc::new(ScriptedGenerator::new([
            "BRIEF",
            "DRAFT",
            "Overall Score: 9/10\n\nFinal Verdict: Ready to publish",
        ]));
        let pipeline = Pipeline::builder().generator(generator).build().unwrap();

        let output = pipeline.run(solar_task()).await.unwrap();
        let markdown = output.to_markdown();

        assert!(markdown.starts_with("# Summarize benefits of solar energy"));
        assert!(markdown.contains("*Requirements: under 200 words*"));
        assert!(markdown.contains("DRAFT"));
        assert_eq!(output.assessment().score, Some(9.0));
        assert!(output.assessment().is_ready());
    }

    #[tokio::test]
    async fn test_statistics_across_runs() {
        let generator = Arc::new(ScriptedGenerator::new([
            "BRIEF",
            "Solar power is cheap and clean.",
            "Overall Score: 8/10",
            "BRIEF",
            "Wind turns turbines.",
            "Overall Score: 6/10",
        ]));
        let stats = Arc::new(StatsObserver::new());
        let collecting = Arc::new(CollectingObserver::new());
        let pipeline = Pipeline::builder()
            .generator(generator)
            .observer(Arc::new(
                FanoutObserver::new()
                    .with(stats.clone())
                    .with(collecting.clone()),
            ))
            .build()
            .unwrap();

        pipeline.run(solar_task()).await.unwrap();
        let wind = Task::new("Explain wind power")
            .with_research(ResearchConfig::new().with_depth(7))
            .with_writer(WriterConfig::new().with_style(WritingStyle::Casual))
            .with_reviewer(
                ReviewerConfig::new()
                    .with_strictness(9)
                    .with_criteria(ReviewCriteria::Accuracy),
            );
        pipeline.run(wind).await.unwrap();
        let failure = pipeline
            .run(Task::new("Out of script"))
            .await
            .unwrap_err();
        assert_eq!(failure.stage, StageName::Research);

        let statistics = stats.statistics();
        assert_eq!(statistics.runs_started, 3);
        assert_eq!(statistics.runs_completed, 2);
        assert_eq!(statistics.runs_failed, 1);

        assert_eq!(statistics.research.total_sessions, 2);
        assert_eq!(statistics.research.average_depth, 6.0);
        let topics: Vec<&str> = statistics
            .research
            .recent
            .iter()
            .map(|s| s.topic.as_str())
            .collect();
        assert_eq!(
            topics,
            vec!["Summarize benefits of solar energy", "Explain wind power"]
        );

        assert_eq!(statistics.writing.total_pieces, 2);
        assert_eq!(statistics.writing.total_words, 9);
        assert_eq!(statistics.writing.average_words, 4);
        assert_eq!(statistics.writing.style_breakdown["professional"], 1);
        assert_eq!(statistics.writing.style_breakdown["casual"], 1);

        assert_eq!(statistics.review.total_reviews, 2);
        assert_eq!(statistics.review.average_strictness, 8.0);
        assert_eq!(statistics.review.average_score, Some(7.0));
        assert_eq!(statistics.review.criteria_breakdown["comprehensive"], 1);
        assert_eq!(statistics.review.criteria_breakdown["accuracy"], 1);
        assert!(statistics.review.last_review >= statistics.writing.last_activity);

        assert_eq!(collecting.status_names().len(), 4 + 4 + 2);
    }
}
