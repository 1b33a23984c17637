/// Canonical field names shared by every strategy output.
pub mod fields {
    /// Natural-language question/text field present on every normalized row.
    pub const QUERY: &str = "query";
    /// Paired document text (embeddings-style rows).
    pub const DOC: &str = "doc";
    /// Image payload field (cauldron-style rows).
    pub const IMAGE: &str = "image";
    /// Image identifier used as the natural/grouping key.
    pub const IMAGE_FILENAME: &str = "image_filename";
    /// Provenance tag added before multi-source unions.
    pub const SOURCE: &str = "source";
}

/// Constants used by the deterministic sampler.
pub mod sampler {
    /// Seed used by every seeded shuffle in the shipped strategies.
    pub const DEFAULT_SEED: u64 = 42;
    /// SplitMix64 increment.
    pub const SPLITMIX_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
}

/// Constants for the docvqa-style union strategy.
pub mod docvqa {
    /// Source family holding both VQA variants.
    pub const FAMILY_LOCAL: &str = "DocVQA";
    /// Remote repository id for the family.
    pub const FAMILY_REMOTE: &str = "lmms-lab/DocVQA";
    /// Document VQA variant.
    pub const VARIANT_DOC: &str = "DocVQA";
    /// Infographic VQA variant.
    pub const VARIANT_INFO: &str = "InfographicVQA";
    /// Split feeding the training partition.
    pub const TRAIN_SPLIT: &str = "validation";
    /// Held-out split feeding the evaluation partition.
    pub const EVAL_SPLIT: &str = "test";
    /// Upstream question field.
    pub const QUESTION_FIELD: &str = "question";
    /// Preferred identifier for `image_filename`.
    pub const PRIMARY_ID_FIELD: &str = "ucsf_document_id";
    /// Fallback identifier for `image_filename`.
    pub const FALLBACK_ID_FIELD: &str = "image_url";
    /// Exact number of evaluation rows.
    pub const EVAL_ROWS: usize = 200;
}

/// Constants for the embeddings-style positional split.
pub mod embeddings {
    /// Remote repository id (no local snapshot exists).
    pub const SOURCE_REMOTE: &str = "manu/embedding_data_v2_100k";
    /// Upstream split.
    pub const SPLIT: &str = "train";
    /// Upstream field renamed to `query`.
    pub const QUERY_FIELD: &str = "text1";
    /// Upstream field renamed to `doc`.
    pub const DOC_FIELD: &str = "text2";
    /// Exact number of evaluation rows.
    pub const EVAL_ROWS: usize = 200;
}

/// Constants for the tabfquad-style key-grouped split.
pub mod tabfquad {
    /// Local snapshot directory name.
    pub const SOURCE_LOCAL: &str = "tabfquad_retrieving";
    /// Remote repository id.
    pub const SOURCE_REMOTE: &str = "coldoc/tabfquad_retrieving";
    /// Requested split; the local snapshot stores these rows under `train`.
    pub const SPLIT: &str = "test";
    /// Split name used by the local snapshot for the same rows.
    pub const LOCAL_SPLIT: &str = "train";
    /// Number of grouping keys drawn into the evaluation partition.
    pub const EVAL_KEYS: usize = 70;
    /// Exact number of evaluation rows kept from the drawn keys.
    pub const EVAL_ROWS: usize = 200;
}

/// Constants for the cauldron-style tagged union.
pub mod cauldron {
    /// Remote repository id (no local snapshot exists).
    pub const FAMILY_REMOTE: &str = "HuggingFaceM4/the_cauldron";
    /// Variants merged into the union; each doubles as its provenance tag.
    pub const VARIANTS: [&str; 3] = ["docvqa", "infographic_vqa", "tat_qa"];
    /// Upstream split.
    pub const SPLIT: &str = "train";
    /// Upstream field renamed to `query`.
    pub const QUERY_FIELD: &str = "texts";
    /// Upstream field renamed to `image`.
    pub const IMAGE_FIELD: &str = "images";
    /// Exact number of evaluation rows.
    pub const EVAL_ROWS: usize = 200;
}

/// Constants for the many-source training-set union.
pub mod train_set {
    /// Remote organization prefix for every source.
    pub const REMOTE_PREFIX: &str = "coldoc/";
    /// Upstream split.
    pub const SPLIT: &str = "train";
    /// Sources merged into the union, in concatenation order.
    pub const SOURCES: [&str; 9] = [
        "infovqa_train",
        "docvqa_train",
        "arxivqa_train",
        "tatdqa_train",
        "tabfquad_train_subsampled",
        "syntheticDocQA_government_reports_train",
        "syntheticDocQA_healthcare_industry_train",
        "syntheticDocQA_artificial_intelligence_train",
        "syntheticDocQA_energy_train",
    ];
    /// Source subsampled before the union.
    pub const ARXIVQA_SOURCE: &str = "arxivqa_train";
    /// Rows kept from the arxivqa source.
    pub const ARXIVQA_ROWS: usize = 10_000;
    /// Exact number of evaluation rows.
    pub const EVAL_ROWS: usize = 500;
}

/// Constants used by provider resolution.
pub mod source {
    /// Default root directory for local snapshots.
    pub const DEFAULT_DATA_DIR: &str = "./data_dir";
    /// Split fetched by the pass-through test accessor.
    pub const TEST_SPLIT: &str = "test";
    /// Environment variable read by the CLI to choose locality (`"1"` = local).
    pub const LOCALITY_ENV: &str = "USE_LOCAL_DATASET";
    /// Shard file extensions accepted by the snapshot provider.
    pub const SHARD_EXTENSIONS: [&str; 3] = ["parquet", "jsonl", "ndjson"];
}

/// Constants used by the CLI writer.
pub mod apps {
    /// Output filename for the training partition.
    pub const TRAIN_FILENAME: &str = "train.jsonl";
    /// Output filename for the test partition.
    pub const TEST_FILENAME: &str = "test.jsonl";
}
