pub mod access;
pub mod audit;
pub mod classify;
pub mod config;
pub mod converter;
pub mod error;
pub mod hasher;
pub mod naming;
pub mod oplog;
pub mod organizer;
pub mod placer;
pub mod preflight;
pub mod scanner;
pub mod state;
pub mod testing;

pub use access::{AccessScope, GrantedFolders, UnrestrictedAccess};
pub use audit::{
    create_audit_system, export_run_log, AuditError, AuditEvent, AuditFilter, AuditHandle,
    AuditRecord, AuditStore, AuditWriter, MemoryAuditStore, Severity, WriterSummary,
};
pub use classify::{Classification, Classifier, MediaKind};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, validate_roots,
    Config, ConfigError, FormatConfig, Layout, OutputConfig, PreflightConfig, ProcessOptions,
};
pub use converter::{
    ConversionJob, ConversionResult, Converter, ConverterConfig, ConverterError,
    ExternalConverter, ToolLocator, WellKnownLocator,
};
pub use error::{EngineError, FileError};
pub use hasher::{digest, ContentHash, HashError};
pub use oplog::{
    load_audit_log, save_audit_log, undo_operations, AuditLogFile, FileOperationRecord,
    OperationKind, OperationLog, OplogError, UndoFailure, UndoReport,
};
pub use organizer::{
    Organizer, Phase, RunProgress, RunReport, RunStatus, ScanReport, UndoOutcome,
};
pub use placer::{FsPlacer, PlacedFile, PlacementMethod, PlacerConfig, PlacerError};
pub use preflight::{CapacityProbe, PreflightError, PreflightReport, SystemCapacity};
pub use scanner::{MediaCandidate, ScanError, ScanStatus, Scanner};
pub use state::{RunCounts, SharedState};
