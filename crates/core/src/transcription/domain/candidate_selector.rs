//! Best-of-N selection over subtitle transcriptions of several artifacts.

use std::path::Path;

use super::hallucination::HallucinationScorer;
use super::transcription_result::TranscriptionResult;
use crate::audio::domain::audio_artifact::{AudioArtifact, ArtifactSet};

#[derive(Clone, Debug, PartialEq)]
pub enum CandidateSource {
    /// The local engine in timed mode.
    Local,
    /// The remote transcription service.
    Remote,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CandidateVariant {
    pub label: String,
    pub artifact: AudioArtifact,
    pub source: CandidateSource,
}

impl CandidateVariant {
    pub fn local(label: &str, artifact: &AudioArtifact) -> Self {
        Self {
            label: label.to_string(),
            artifact: artifact.clone(),
            source: CandidateSource::Local,
        }
    }

    pub fn remote(label: &str, artifact: &AudioArtifact) -> Self {
        Self {
            label: label.to_string(),
            artifact: artifact.clone(),
            source: CandidateSource::Remote,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub result: TranscriptionResult,
    pub hallucination_score: usize,
}

/// Produces the transcription of one variant. `None` means the attempt
/// failed; it then scores worst and only wins when nothing else ran.
pub trait CandidateRunner {
    fn run(&self, variant: &CandidateVariant) -> Option<TranscriptionResult>;
}

/// Winner plus the score of every attempted variant, in attempt order.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub winner: Candidate,
    pub attempts: Vec<(String, usize)>,
}

/// Variant order for the full chain: remix, uncut vocals, trimmed vocals,
/// remote service, clean input. Unavailable artifacts are left out and no
/// artifact is transcribed twice by the local engine.
///
/// The remote variant always re-sends an artifact the local engine already
/// tried (the remix or the processed clip). It counts as a separate candidate
/// because the service runs a different recognizer on the same audio.
pub fn selection_plan(artifacts: &ArtifactSet, remote_enabled: bool) -> Vec<CandidateVariant> {
    let mut plan: Vec<CandidateVariant> = Vec::new();
    let tried = |plan: &[CandidateVariant], path: &Path| {
        plan.iter()
            .any(|v| v.source == CandidateSource::Local && v.artifact.path() == path)
    };

    if let Some(remix) = &artifacts.remix {
        plan.push(CandidateVariant::local("remix", remix));
    }
    if !tried(&plan, artifacts.no_cut.path()) {
        plan.push(CandidateVariant::local("no_cut", &artifacts.no_cut));
    }
    let processed_tried = tried(&plan, artifacts.processed.path());
    if !processed_tried {
        plan.push(CandidateVariant::local("processed", &artifacts.processed));
    }
    if remote_enabled {
        // Remix when trimming produced a clip of its own, else the processed
        // clip, which then equals the uncut vocals.
        let target = match (&artifacts.remix, processed_tried) {
            (Some(remix), false) => remix,
            _ => &artifacts.processed,
        };
        plan.push(CandidateVariant::remote("remote", target));
    }
    if !tried(&plan, artifacts.clean.path()) {
        plan.push(CandidateVariant::local("clean", &artifacts.clean));
    }
    plan
}

pub struct CandidateSelector<'a> {
    scorer: &'a HallucinationScorer,
}

impl<'a> CandidateSelector<'a> {
    pub fn new(scorer: &'a HallucinationScorer) -> Self {
        Self { scorer }
    }

    /// Run variants in order until the best score is acceptable.
    ///
    /// The returned score is never above any attempted variant's score; on a
    /// tie the earlier variant is kept. `None` only for an empty plan.
    pub fn select(
        &self,
        plan: &[CandidateVariant],
        runner: &dyn CandidateRunner,
    ) -> Option<Selection> {
        let mut best: Option<Candidate> = None;
        let mut attempts = Vec::with_capacity(plan.len());

        for variant in plan {
            let candidate = match runner.run(variant) {
                Some(result) => Candidate {
                    label: variant.label.clone(),
                    hallucination_score: self.scorer.score(&result),
                    result,
                },
                None => Candidate {
                    label: variant.label.clone(),
                    result: TranscriptionResult::empty(),
                    hallucination_score: usize::MAX,
                },
            };
            log::info!(
                "candidate {}: hallucination score {}",
                candidate.label,
                candidate.hallucination_score
            );
            attempts.push((candidate.label.clone(), candidate.hallucination_score));

            let improves = best
                .as_ref()
                .map_or(true, |b| candidate.hallucination_score < b.hallucination_score);
            if improves {
                best = Some(candidate);
            }
            if best
                .as_ref()
                .is_some_and(|b| self.scorer.is_acceptable(b.hallucination_score))
            {
                break;
            }
        }

        best.map(|winner| Selection { winner, attempts })
    }
}
