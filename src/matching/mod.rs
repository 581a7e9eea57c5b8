//! 匹配层：评估结果模型、评估服务、评分阶段与技能抽取

pub mod assessment;
pub mod assessor;
pub mod scorer;
pub mod skills;

pub use assessment::{
    extract_json_block, parse_assessment, Assessment, AssessmentOutcome, ScoredCandidate,
};
pub use assessor::{Assessor, LlmAssessor};
pub use scorer::{MatchScorer, ScoringReport};
pub use skills::{SkillExtractor, StructuredSkills};
