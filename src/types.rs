/// Logical identifier for a record source.
/// Examples: `DocVQA`, `tabfquad_retrieving`, `arxivqa_train`
pub type SourceId = String;
/// Sub-dataset selector inside a source family.
/// Examples: `DocVQA`, `InfographicVQA`, `tat_qa`
pub type ConfigVariant = String;
/// Upstream split name requested from a provider.
/// Examples: `train`, `validation`, `test`
pub type SplitName = String;
/// Column/field name inside a record.
/// Examples: `question`, `query`, `image_filename`
pub type FieldName = String;
/// Normalized grouping key used by key-grouped partitioning.
/// Example: `page_0142.png`
pub type GroupKey = String;
/// Stable strategy name exposed by the registry.
/// Examples: `docvqa`, `cauldron`, `train_set`
pub type StrategyId = String;
/// Provenance label written into the `source` field.
/// Examples: `docvqa`, `infographic_vqa`, `tat_qa`
pub type ProvenanceTag = String;
