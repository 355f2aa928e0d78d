//! One video cycle: play, fullscreen, wait for the end, leave, next.
//!
//! [`CycleEngine::run_cycle`] never fails. Errors and panics from the screen
//! or input capabilities are caught here and reported as
//! `Failed(UnexpectedError)`, so the controller only ever sees a
//! [`CycleOutcome`].

use anyhow::Result;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::automation::cancel::CancelToken;
use crate::automation::config::{AutomationConfig, SearchConfig};
use crate::automation::detection::{ScreenRegion, ScreenSearch, SearchSpec, find_on_screen};
use crate::automation::events::{AutomationEvent, Reporter};
use crate::automation::input::{InputDevice, Key, click_center_of, press_key};
use crate::automation::state::{CycleOutcome, CycleState, FailureReason, RunState};

const CANCELLED: CycleState = CycleState::Finished(CycleOutcome::Failed(FailureReason::Cancelled));

pub struct CycleEngine<'a> {
    screen: &'a dyn ScreenSearch,
    input: &'a dyn InputDevice,
    config: &'a AutomationConfig,
    run_state: &'a RunState,
    cancel: &'a CancelToken,
    reporter: &'a Reporter,
}

impl<'a> CycleEngine<'a> {
    pub fn new(
        screen: &'a dyn ScreenSearch,
        input: &'a dyn InputDevice,
        config: &'a AutomationConfig,
        run_state: &'a RunState,
        cancel: &'a CancelToken,
        reporter: &'a Reporter,
    ) -> Self {
        Self {
            screen,
            input,
            config,
            run_state,
            cancel,
            reporter,
        }
    }

    /// Runs one full cycle and returns how it ended.
    pub fn run_cycle(&self) -> CycleOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.drive())) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.reporter
                    .error(format!("Error in video processing: {:#}", e));
                CycleOutcome::Failed(FailureReason::UnexpectedError)
            }
            Err(payload) => {
                let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                self.reporter
                    .error(format!("Panic in video processing: {}", msg));
                CycleOutcome::Failed(FailureReason::UnexpectedError)
            }
        }
    }

    fn drive(&self) -> Result<CycleOutcome> {
        let mut state = CycleState::SearchPlay;
        loop {
            if let CycleState::Finished(outcome) = state {
                return Ok(outcome);
            }
            state = self.step(state)?;
        }
    }

    /// Advances the state machine by one step.
    ///
    /// Checks for a stop request before doing anything, so no search or click
    /// is issued once the run is stopped.
    pub fn step(&self, state: CycleState) -> Result<CycleState> {
        if let CycleState::Finished(_) = state {
            return Ok(state);
        }
        if self.cancel.is_cancelled() {
            return Ok(CANCELLED);
        }

        let next = match state {
            CycleState::SearchPlay => {
                self.reporter.info("Looking for play button...");
                match self.search(&self.config.play)? {
                    Some(region) => {
                        self.reporter
                            .info("Play button found - processing as regular video");
                        CycleState::ClickPlay(region)
                    }
                    None if self.cancel.is_cancelled() => CANCELLED,
                    None => {
                        self.reporter.info(format!(
                            "{}: treating as none video",
                            FailureReason::PlayNotFound
                        ));
                        CycleState::NoneVideoPath
                    }
                }
            }

            CycleState::ClickPlay(region) => {
                self.reporter.info("Clicking play button");
                click_center_of(self.input, &region)?;
                self.pause(self.config.play_settle_ms);
                CycleState::SearchFullscreen
            }

            CycleState::SearchFullscreen => {
                self.reporter.info("Looking for fullscreen button...");
                match self.search(&self.config.fullscreen)? {
                    Some(region) => CycleState::ClickFullscreen(region),
                    None if self.cancel.is_cancelled() => CANCELLED,
                    None => {
                        // Play was there, so a missing fullscreen button is a real failure
                        self.reporter
                            .error("Fullscreen button not found after clicking play");
                        CycleState::Finished(CycleOutcome::Failed(
                            FailureReason::FullscreenNotFound,
                        ))
                    }
                }
            }

            CycleState::ClickFullscreen(region) => {
                self.reporter.info("Clicking fullscreen button");
                click_center_of(self.input, &region)?;
                CycleState::WaitForEnd
            }

            CycleState::WaitForEnd => {
                self.reporter.info("Waiting for video to end...");
                match self.search(&self.config.end_marker)? {
                    Some(_) => CycleState::DismissAndAdvance,
                    None if self.cancel.is_cancelled() => CANCELLED,
                    None => {
                        self.reporter
                            .error("Video end indicator not found within timeout");
                        CycleState::Finished(CycleOutcome::Failed(
                            FailureReason::EndMarkerTimeout,
                        ))
                    }
                }
            }

            CycleState::DismissAndAdvance => {
                self.reporter.info("Video ended, pressing ESC");
                press_key(self.input, Key::Escape)?;
                self.pause(self.config.dismiss_settle_ms);
                CycleState::SearchNext
            }

            CycleState::SearchNext => match self.find_next()? {
                Some(region) => {
                    click_center_of(self.input, &region)?;
                    self.reporter.success("Video cycle completed successfully");
                    CycleState::Finished(CycleOutcome::Completed)
                }
                None if self.cancel.is_cancelled() => CANCELLED,
                None => {
                    self.reporter.warn("No next button found");
                    CycleState::Finished(CycleOutcome::Failed(FailureReason::NoNextControl))
                }
            },

            CycleState::NoneVideoPath => {
                self.reporter
                    .info("Detected none video - skipping directly to next");
                let count = self.run_state.record_none_video();
                self.reporter
                    .emit(AutomationEvent::NoneVideoCountChanged(count));
                self.pause(self.config.none_video_settle_ms);
                if self.cancel.is_cancelled() {
                    return Ok(CANCELLED);
                }

                match self.find_next()? {
                    Some(region) => {
                        click_center_of(self.input, &region)?;
                        self.reporter.success("None video handled successfully");
                        CycleState::Finished(CycleOutcome::Completed)
                    }
                    None if self.cancel.is_cancelled() => CANCELLED,
                    None => {
                        self.reporter.warn("No next button found");
                        CycleState::Finished(CycleOutcome::Failed(
                            FailureReason::NoneVideoNoNext,
                        ))
                    }
                }
            }

            CycleState::Finished(_) => unreachable!("finished state returned above"),
        };

        Ok(next)
    }

    fn search(&self, search: &SearchConfig) -> Result<Option<ScreenRegion>> {
        let spec = SearchSpec::from_config(search, self.config.poll_interval());
        find_on_screen(self.screen, &spec, self.cancel)
    }

    /// Tries each next-button variant in order and returns the first match.
    fn find_next(&self) -> Result<Option<ScreenRegion>> {
        self.reporter.info("Looking for next button...");
        for candidate in &self.config.next_buttons {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            self.reporter
                .info(format!("Trying to locate {}...", candidate.image));
            if let Some(region) = self.search(candidate)? {
                self.reporter
                    .info(format!("Found {}, clicking", candidate.image));
                return Ok(Some(region));
            }
        }
        Ok(None)
    }

    fn pause(&self, ms: u64) {
        self.cancel.sleep(Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::events::create_event_channel;
    use crate::automation::testing::{InputAction, RecordingInput, ScriptedScreen, fast_config};
    use std::sync::Arc;
    use std::sync::mpsc::Receiver;

    const PLAY: ScreenRegion = ScreenRegion {
        x: 100,
        y: 100,
        width: 40,
        height: 20,
    };
    const FULLSCREEN: ScreenRegion = ScreenRegion {
        x: 900,
        y: 600,
        width: 10,
        height: 10,
    };
    const END: ScreenRegion = ScreenRegion {
        x: 0,
        y: 0,
        width: 200,
        height: 50,
    };
    const NEXT: ScreenRegion = ScreenRegion {
        x: 500,
        y: 300,
        width: 60,
        height: 30,
    };

    struct Harness {
        config: AutomationConfig,
        run_state: RunState,
        cancel: CancelToken,
        reporter: Reporter,
        events: Receiver<AutomationEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let (sender, events) = create_event_channel();
            let run_state = RunState::new();
            run_state.begin_run();
            Self {
                config: fast_config(),
                run_state,
                cancel: CancelToken::new(),
                reporter: Reporter::new(Arc::new(sender)),
                events,
            }
        }

        fn run(&self, screen: &ScriptedScreen, input: &RecordingInput) -> CycleOutcome {
            CycleEngine::new(
                screen,
                input,
                &self.config,
                &self.run_state,
                &self.cancel,
                &self.reporter,
            )
            .run_cycle()
        }

        fn none_video_events(&self) -> Vec<u32> {
            self.events
                .try_iter()
                .filter_map(|e| match e {
                    AutomationEvent::NoneVideoCountChanged(n) => Some(n),
                    _ => None,
                })
                .collect()
        }
    }

    fn regular_screen() -> ScriptedScreen {
        ScriptedScreen::new()
            .with_image("play.png", PLAY)
            .with_image("fullscreen.png", FULLSCREEN)
            .with_image("out.png", END)
    }

    #[test]
    fn test_every_state_of_a_regular_cycle_is_logged() {
        let harness = Harness::new();
        let screen = regular_screen().with_image("next1.png", NEXT);
        let input = RecordingInput::new();

        assert_eq!(harness.run(&screen, &input), CycleOutcome::Completed);

        let messages: Vec<String> = harness
            .events
            .try_iter()
            .filter_map(|e| match e {
                AutomationEvent::Log { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        let expected = [
            "Looking for play button...",
            "Clicking play button",
            "Looking for fullscreen button...",
            "Clicking fullscreen button",
            "Waiting for video to end...",
            "Video ended, pressing ESC",
            "Looking for next button...",
            "Video cycle completed successfully",
        ];
        let mut from = 0;
        for line in expected {
            let at = messages[from..]
                .iter()
                .position(|m| m == line)
                .unwrap_or_else(|| panic!("missing or out of order: {}", line));
            from += at + 1;
        }
    }

    #[test]
    fn test_regular_video_completes() {
        let harness = Harness::new();
        let screen = regular_screen().with_image("next1.png", NEXT);
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(
            input.actions(),
            vec![
                InputAction::Click(120, 110),
                InputAction::Click(905, 605),
                InputAction::Key(Key::Escape),
                InputAction::Click(530, 315),
            ]
        );
        assert_eq!(harness.run_state.none_video_count(), 0);
        assert!(harness.none_video_events().is_empty());
        assert_eq!(screen.probe_count("next2.png"), 0);
    }

    #[test]
    fn test_none_video_uses_fallback_next() {
        let harness = Harness::new();
        let screen = ScriptedScreen::new().with_image("next2.png", NEXT);
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(harness.run_state.none_video_count(), 1);
        assert_eq!(harness.none_video_events(), vec![1]);
        assert!(screen.probe_count("next1.png") >= 1);
        assert_eq!(input.actions(), vec![InputAction::Click(530, 315)]);
    }

    #[test]
    fn test_play_miss_never_searches_fullscreen() {
        let harness = Harness::new();
        // Fullscreen would be found, but without play it must not be looked at
        let screen = ScriptedScreen::new()
            .with_image("fullscreen.png", FULLSCREEN)
            .with_image("out.png", END);
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert_eq!(
            outcome,
            CycleOutcome::Failed(FailureReason::NoneVideoNoNext)
        );
        assert_eq!(screen.probe_count("fullscreen.png"), 0);
        assert_eq!(screen.probe_count("out.png"), 0);
        assert!(input.actions().is_empty());
        assert_eq!(harness.run_state.none_video_count(), 1);
    }

    #[test]
    fn test_fullscreen_missing_fails() {
        let harness = Harness::new();
        let screen = ScriptedScreen::new().with_image("play.png", PLAY);
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert_eq!(
            outcome,
            CycleOutcome::Failed(FailureReason::FullscreenNotFound)
        );
        assert_eq!(input.actions(), vec![InputAction::Click(120, 110)]);
        assert_eq!(screen.probe_count("out.png"), 0);
        assert_eq!(harness.run_state.none_video_count(), 0);
    }

    #[test]
    fn test_end_marker_timeout_fails() {
        let harness = Harness::new();
        let screen = ScriptedScreen::new()
            .with_image("play.png", PLAY)
            .with_image("fullscreen.png", FULLSCREEN)
            .with_image("next1.png", NEXT);
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert_eq!(
            outcome,
            CycleOutcome::Failed(FailureReason::EndMarkerTimeout)
        );
        assert!(!input.actions().contains(&InputAction::Key(Key::Escape)));
        assert_eq!(screen.probe_count("next1.png"), 0);
    }

    #[test]
    fn test_no_next_after_end_fails() {
        let harness = Harness::new();
        let screen = regular_screen();
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert_eq!(outcome, CycleOutcome::Failed(FailureReason::NoNextControl));
        assert!(screen.probe_count("next1.png") >= 1);
        assert!(screen.probe_count("next2.png") >= 1);
        assert_eq!(input.actions().last(), Some(&InputAction::Key(Key::Escape)));
    }

    #[test]
    fn test_next_variants_tried_in_order() {
        let harness = Harness::new();
        let screen = regular_screen().with_image("next2.png", NEXT);
        let input = RecordingInput::new();

        assert_eq!(harness.run(&screen, &input), CycleOutcome::Completed);

        let probes = screen.probes();
        let first_next1 = probes.iter().position(|p| p == "next1.png").unwrap();
        let first_next2 = probes.iter().position(|p| p == "next2.png").unwrap();
        assert!(first_next1 < first_next2);
    }

    #[test]
    fn test_probe_error_is_unexpected() {
        let harness = Harness::new();
        let screen = ScriptedScreen::new()
            .with_image("play.png", PLAY)
            .with_error("fullscreen.png", "capture device lost");
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert_eq!(
            outcome,
            CycleOutcome::Failed(FailureReason::UnexpectedError)
        );
        let logged_error = harness.events.try_iter().any(|e| {
            matches!(e, AutomationEvent::Log { message, .. } if message.contains("capture device lost"))
        });
        assert!(logged_error);
    }

    #[test]
    fn test_click_error_is_unexpected() {
        let harness = Harness::new();
        let screen = regular_screen().with_image("next1.png", NEXT);
        let input = RecordingInput::failing();

        assert_eq!(
            harness.run(&screen, &input),
            CycleOutcome::Failed(FailureReason::UnexpectedError)
        );
    }

    #[test]
    fn test_panic_is_unexpected() {
        let harness = Harness::new();
        let screen = ScriptedScreen::new().with_panic("play.png");
        let input = RecordingInput::new();

        assert_eq!(
            harness.run(&screen, &input),
            CycleOutcome::Failed(FailureReason::UnexpectedError)
        );
    }

    #[test]
    fn test_cancelled_before_start_does_nothing() {
        let harness = Harness::new();
        harness.cancel.cancel();
        let screen = regular_screen().with_image("next1.png", NEXT);
        let input = RecordingInput::new();

        let outcome = harness.run(&screen, &input);

        assert!(outcome.is_cancelled());
        assert!(screen.probes().is_empty());
        assert!(input.actions().is_empty());
    }

    #[test]
    fn test_cancel_during_play_search_is_not_a_none_video() {
        let mut harness = Harness::new();
        harness.config.play.timeout_ms = 60_000;
        let stopper = harness.cancel.clone();
        let screen = ScriptedScreen::new().with_image("next1.png", NEXT);
        let input = RecordingInput::new();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            stopper.cancel();
        });
        let outcome = harness.run(&screen, &input);
        handle.join().unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(harness.run_state.none_video_count(), 0);
        assert_eq!(screen.probe_count("next1.png"), 0);
        assert!(input.actions().is_empty());
    }

    #[test]
    fn test_step_leaves_finished_state_alone() {
        let harness = Harness::new();
        let screen = ScriptedScreen::new();
        let input = RecordingInput::new();
        let engine = CycleEngine::new(
            &screen,
            &input,
            &harness.config,
            &harness.run_state,
            &harness.cancel,
            &harness.reporter,
        );

        let done = CycleState::Finished(CycleOutcome::Completed);
        assert_eq!(engine.step(done.clone()).unwrap(), done);
        assert_eq!(
            engine.step(CycleState::ClickPlay(PLAY)).unwrap(),
            CycleState::SearchFullscreen
        );
    }
}
