//! Physical plan nodes.
//!
//! A plan is an immutable tree of [`PlanNode`]s. Every node carries the
//! schema of the tuples it produces and zero or more children; the
//! executor builder turns the tree into an executor tree one node at a
//! time.

use std::sync::Arc;

use crate::catalog::{DbInfo, TableInfo};
use crate::codec::{ObjectId, Tuple};
use crate::expr::Expr;
use crate::schema::{merge_schema, Schema};

/// How a matcher folds the effects of its child rows into one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectType {
    /// Allow if any row matched.
    AllowOverride,
    /// Allow unless some matched row denies; no rows allows.
    DenyOverride,
    /// Allow if some row allows and none denies.
    AllowAndDeny,
    /// The effect of the first matched row.
    Priority,
    /// The effect of the matched row with the lowest priority value.
    PriorityBaseOnRole,
}

#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub schema: Arc<Schema>,
    pub table: TableInfo,
    /// Rows to insert when there is no child.
    pub raw_values: Vec<Tuple>,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub schema: Arc<Schema>,
    pub table: TableInfo,
    /// Column offset and the expression computing its new value.
    pub update_attrs: Vec<(usize, Expr)>,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub schema: Arc<Schema>,
    pub table: TableInfo,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct SeqScanPlan {
    pub schema: Arc<Schema>,
    pub table_id: u64,
    pub predicate: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct IndexScanPlan {
    pub schema: Arc<Schema>,
    pub index_id: u64,
    /// Primary entries carry the row key in the value; secondary entries
    /// carry the row id as the key suffix.
    pub primary: bool,
    /// Full key prefix to seek to, see `codec::key::index_key_prefix`.
    pub prefix: Vec<u8>,
    /// Whether the caller stacks a row-id scan on top to fetch tuples.
    pub fetch_tuple: bool,
}

#[derive(Debug, Clone)]
pub struct MultiIndexScanPlan {
    pub schema: Arc<Schema>,
    /// Exactly two children; the left one is built into the hash table.
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct TableRowIdScanPlan {
    pub schema: Arc<Schema>,
    pub table_id: u64,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct LimitPlan {
    pub schema: Arc<Schema>,
    pub limit: usize,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct ConstPlan {
    pub schema: Arc<Schema>,
    pub predicate: Expr,
}

#[derive(Debug, Clone)]
pub struct MatcherPlan {
    pub schema: Arc<Schema>,
    pub effect: EffectType,
    /// Offset of the effect column in the child's rows.
    pub effect_column: usize,
    /// Offset of the priority column, required by `PriorityBaseOnRole`.
    pub priority_column: Option<usize>,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub struct MiddlePlan {
    pub schema: Arc<Schema>,
    pub rows: Vec<(Tuple, ObjectId)>,
}

#[derive(Debug, Clone)]
pub struct SchemaPlan {
    pub schema: Arc<Schema>,
    pub db: DbInfo,
}

#[derive(Debug, Clone)]
pub struct ShortCircuitPlan {
    pub schema: Arc<Schema>,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone)]
pub enum PlanNode {
    Insert(InsertPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
    SeqScan(SeqScanPlan),
    IndexScan(IndexScanPlan),
    MultiIndexScan(MultiIndexScanPlan),
    TableRowIdScan(TableRowIdScanPlan),
    Limit(LimitPlan),
    Const(ConstPlan),
    Matcher(MatcherPlan),
    Middle(MiddlePlan),
    Schema(SchemaPlan),
    ShortCircuit(ShortCircuitPlan),
}

impl PlanNode {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::Insert(_) => "Insert",
            PlanNode::Update(_) => "Update",
            PlanNode::Delete(_) => "Delete",
            PlanNode::SeqScan(_) => "SeqScan",
            PlanNode::IndexScan(_) => "IndexScan",
            PlanNode::MultiIndexScan(_) => "MultiIndexScan",
            PlanNode::TableRowIdScan(_) => "TableRowIdScan",
            PlanNode::Limit(_) => "Limit",
            PlanNode::Const(_) => "Const",
            PlanNode::Matcher(_) => "Matcher",
            PlanNode::Middle(_) => "Middle",
            PlanNode::Schema(_) => "Schema",
            PlanNode::ShortCircuit(_) => "ShortCircuit",
        }
    }

    /// Schema of the tuples this node yields.
    pub fn schema(&self) -> &Arc<Schema> {
        match self {
            PlanNode::Insert(p) => &p.schema,
            PlanNode::Update(p) => &p.schema,
            PlanNode::Delete(p) => &p.schema,
            PlanNode::SeqScan(p) => &p.schema,
            PlanNode::IndexScan(p) => &p.schema,
            PlanNode::MultiIndexScan(p) => &p.schema,
            PlanNode::TableRowIdScan(p) => &p.schema,
            PlanNode::Limit(p) => &p.schema,
            PlanNode::Const(p) => &p.schema,
            PlanNode::Matcher(p) => &p.schema,
            PlanNode::Middle(p) => &p.schema,
            PlanNode::Schema(p) => &p.schema,
            PlanNode::ShortCircuit(p) => &p.schema,
        }
    }

    pub fn children(&self) -> &[PlanNode] {
        match self {
            PlanNode::Insert(p) => &p.children,
            PlanNode::Update(p) => &p.children,
            PlanNode::Delete(p) => &p.children,
            PlanNode::MultiIndexScan(p) => &p.children,
            PlanNode::TableRowIdScan(p) => &p.children,
            PlanNode::Limit(p) => &p.children,
            PlanNode::Matcher(p) => &p.children,
            PlanNode::ShortCircuit(p) => &p.children,
            PlanNode::SeqScan(_)
            | PlanNode::IndexScan(_)
            | PlanNode::Const(_)
            | PlanNode::Middle(_)
            | PlanNode::Schema(_) => &[],
        }
    }

    /// Number of children the node needs before it can be built.
    pub fn required_children(&self) -> usize {
        match self {
            PlanNode::Update(_)
            | PlanNode::Delete(_)
            | PlanNode::TableRowIdScan(_)
            | PlanNode::Limit(_)
            | PlanNode::Matcher(_)
            | PlanNode::ShortCircuit(_) => 1,
            PlanNode::MultiIndexScan(_) => 2,
            _ => 0,
        }
    }

    pub fn seq_scan(table: &TableInfo, namespace: &str, predicate: Option<Expr>) -> Self {
        PlanNode::SeqScan(SeqScanPlan {
            schema: Arc::new(table.schema(namespace)),
            table_id: table.id,
            predicate,
        })
    }

    /// Index scan over the entries of `index_id` starting with `prefix`.
    pub fn index_scan(schema: Arc<Schema>, index_id: u64, primary: bool, prefix: Vec<u8>) -> Self {
        PlanNode::IndexScan(IndexScanPlan {
            schema,
            index_id,
            primary,
            prefix,
            fetch_tuple: false,
        })
    }

    /// Fetch full rows of `table` for the row ids produced by `child`.
    pub fn row_id_scan(table: &TableInfo, namespace: &str, child: PlanNode) -> Self {
        PlanNode::TableRowIdScan(TableRowIdScanPlan {
            schema: Arc::new(table.schema(namespace)),
            table_id: table.id,
            children: vec![child],
        })
    }

    /// Hash intersection of two row producers; the output schema is the
    /// merge of both sides.
    pub fn multi_index_scan(left: PlanNode, right: PlanNode) -> Self {
        let schema = Arc::new(merge_schema(left.schema(), right.schema()));
        PlanNode::MultiIndexScan(MultiIndexScanPlan {
            schema,
            children: vec![left, right],
        })
    }

    pub fn limit(limit: usize, child: PlanNode) -> Self {
        PlanNode::Limit(LimitPlan {
            schema: Arc::clone(child.schema()),
            limit,
            children: vec![child],
        })
    }

    pub fn insert_values(table: &TableInfo, namespace: &str, raw_values: Vec<Tuple>) -> Self {
        PlanNode::Insert(InsertPlan {
            schema: Arc::new(table.schema(namespace)),
            table: table.clone(),
            raw_values,
            children: Vec::new(),
        })
    }

    pub fn insert_from(table: &TableInfo, namespace: &str, child: PlanNode) -> Self {
        PlanNode::Insert(InsertPlan {
            schema: Arc::new(table.schema(namespace)),
            table: table.clone(),
            raw_values: Vec::new(),
            children: vec![child],
        })
    }

    pub fn update(table: &TableInfo, update_attrs: Vec<(usize, Expr)>, child: PlanNode) -> Self {
        PlanNode::Update(UpdatePlan {
            schema: Arc::clone(child.schema()),
            table: table.clone(),
            update_attrs,
            children: vec![child],
        })
    }

    pub fn delete(table: &TableInfo, child: PlanNode) -> Self {
        PlanNode::Delete(DeletePlan {
            schema: Arc::clone(child.schema()),
            table: table.clone(),
            children: vec![child],
        })
    }

    pub fn constant(predicate: Expr) -> Self {
        PlanNode::Const(ConstPlan {
            schema: Arc::new(Schema::default()),
            predicate,
        })
    }

    pub fn matcher(effect: EffectType, effect_column: usize, child: PlanNode) -> Self {
        PlanNode::Matcher(MatcherPlan {
            schema: Arc::new(Schema::default()),
            effect,
            effect_column,
            priority_column: None,
            children: vec![child],
        })
    }

    pub fn middle(schema: Arc<Schema>, rows: Vec<(Tuple, ObjectId)>) -> Self {
        PlanNode::Middle(MiddlePlan { schema, rows })
    }

    pub fn create_database(db: DbInfo) -> Self {
        PlanNode::Schema(SchemaPlan {
            schema: Arc::new(Schema::default()),
            db,
        })
    }

    pub fn short_circuit(child: PlanNode) -> Self {
        PlanNode::ShortCircuit(ShortCircuitPlan {
            schema: Arc::clone(child.schema()),
            children: vec![child],
        })
    }
}
