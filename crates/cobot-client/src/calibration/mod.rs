//! 墙面平面标定与屏幕映射

pub mod plane;
pub mod screen;

pub use plane::{PlaneCalibrationEngine, PlaneFit, PlaneFrame, fit_best_plane};
pub use screen::ScreenMapper;
