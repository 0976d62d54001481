/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Float,
    Text,
    Timestamp,
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Surrogate key generated by the warehouse on insert
    pub identity: bool,
    /// Rows are placed on compute nodes by this column's value
    pub dist_key: bool,
    /// Rows are stored on disk ordered by this column
    pub sort_key: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
            primary_key: false,
            identity: false,
            dist_key: false,
            sort_key: false,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, col_type)
        }
    }

    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            ..self
        }
    }

    /// Auto-incrementing surrogate key, starting at 1
    pub const fn identity(self) -> Self {
        Self {
            identity: true,
            ..self
        }
    }

    pub const fn dist_key(self) -> Self {
        Self {
            dist_key: true,
            ..self
        }
    }

    pub const fn sort_key(self) -> Self {
        Self {
            sort_key: true,
            ..self
        }
    }
}

/// Table-level distribution directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistStyle {
    /// No directive; the warehouse decides
    Auto,
    /// Distribute by the column flagged `dist_key`
    Key,
    /// Replicate the full table on every node
    All,
}

/// What a table is for in the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Staging,
    Fact,
    Dimension,
}

impl std::fmt::Display for TableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableRole::Staging => write!(f, "staging"),
            TableRole::Fact => write!(f, "fact"),
            TableRole::Dimension => write!(f, "dimension"),
        }
    }
}

/// External data set a staging table is bulk loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingSource {
    /// Event log, loaded through an explicit field-mapping document
    Events,
    /// Song catalog, loaded with automatic field inference
    Songs,
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub role: TableRole,
    pub columns: &'static [Column],
    pub dist_style: DistStyle,
    /// Only set for staging tables
    pub source: Option<StagingSource>,
}

impl TableSchema {
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    pub fn dist_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.dist_key)
    }

    pub fn sort_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.sort_key)
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns that take a value on insert (everything except identity columns)
    pub fn insertable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.identity)
    }
}
