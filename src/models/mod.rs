mod api;

pub use api::{
    CoverLetter, CoverLetterRequest, HealthResponse, LearningResourcesQuery,
    LearningResourcesResponse, ResumeAnalysis, ResumeAnalysisRequest, SkillGapAnalysis,
    SkillGapDraft, SkillGapRequest, SkillRecommendation, ToolResponse,
};
