pub mod adapter;
pub mod lesson;
pub mod parser;

pub use adapter::{CalendarDocument, EmitSettings, EventBlock, EventSummary};
pub use lesson::LessonRecord;
pub use parser::{ExtractError, HeaderMatch, LineClass};
