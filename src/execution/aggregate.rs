//! Grouped aggregation.
//!
//! Two aggregator variants share one result iterator: the integer
//! aggregator folds MIN/MAX/SUM/AVG/COUNT over an int column, the string
//! aggregator supports COUNT only. Grouping is by the value of a single
//! column; the no-grouping case uses a single sentinel group. The
//! [`Aggregate`] operator drains its child on `open` and then iterates the
//! per-group results; iteration order over groups is unspecified.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::common::exception::DbError;
use crate::execution::op_iterator::{Lookahead, OpIterator};
use crate::storage::table::tuple::Tuple;
use crate::types::field::Field;
use crate::types::type_id::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl AggregateOp {
    fn name(&self) -> &'static str {
        match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        }
    }
}

/// Running state of one group.
#[derive(Debug, Default, Clone, Copy)]
struct GroupState {
    acc: i32,
    count: i32,
}

/// Computes an aggregate over a stream of int fields, grouped by an
/// optional group-by column.
pub struct IntegerAggregator {
    gfield: Option<usize>,
    afield: usize,
    op: AggregateOp,
    groups: HashMap<Option<Field>, GroupState>,
}

impl IntegerAggregator {
    /// `gfield` is the index of the group-by column, or `None` for a single
    /// ungrouped aggregate; `afield` is the index of the int column being
    /// aggregated.
    pub fn new(gfield: Option<usize>, afield: usize, op: AggregateOp) -> Self {
        Self {
            gfield,
            afield,
            op,
            groups: HashMap::new(),
        }
    }

    /// Folds one tuple into its group's running state.
    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<(), DbError> {
        let key = self.gfield.map(|i| tuple.get_field(i).clone());
        let value = match tuple.get_field(self.afield) {
            Field::Int(v) => *v,
            Field::Str(_) => {
                return Err(DbError::IllegalArgument(
                    "integer aggregator over a string column".to_string(),
                ))
            }
        };

        match self.groups.entry(key) {
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(GroupState {
                    acc: value,
                    count: 1,
                });
            }
            std::collections::hash_map::Entry::Occupied(mut e) => {
                let state = e.get_mut();
                state.count += 1;
                state.acc = match self.op {
                    AggregateOp::Min => state.acc.min(value),
                    AggregateOp::Max => state.acc.max(value),
                    AggregateOp::Sum | AggregateOp::Avg => state.acc + value,
                    AggregateOp::Count => state.acc,
                };
            }
        }
        Ok(())
    }

    /// Iterator over the per-group results computed so far.
    pub fn iterator(&self, group_type: Option<TypeId>) -> AggregateIterator {
        AggregateIterator::new(group_type, self.op, &self.groups)
    }
}

/// Counts string fields per group; COUNT is the only aggregate that makes
/// sense over strings.
pub struct StringAggregator {
    gfield: Option<usize>,
    op: AggregateOp,
    groups: HashMap<Option<Field>, GroupState>,
}

impl StringAggregator {
    /// Fails with [`DbError::IllegalArgument`] for any operator other than
    /// COUNT.
    pub fn new(gfield: Option<usize>, _afield: usize, op: AggregateOp) -> Result<Self, DbError> {
        if op != AggregateOp::Count {
            return Err(DbError::IllegalArgument(format!(
                "string aggregator only supports count, got {}",
                op.name()
            )));
        }
        Ok(Self {
            gfield,
            op,
            groups: HashMap::new(),
        })
    }

    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<(), DbError> {
        let key = self.gfield.map(|i| tuple.get_field(i).clone());
        self.groups.entry(key).or_default().count += 1;
        Ok(())
    }

    pub fn iterator(&self, group_type: Option<TypeId>) -> AggregateIterator {
        AggregateIterator::new(group_type, self.op, &self.groups)
    }
}

/// Result schema shared by both aggregators: `(aggregateVal)` without
/// grouping, `(groupVal, aggregateVal)` with it.
fn output_schema(group_type: Option<TypeId>) -> Arc<Schema> {
    match group_type {
        None => Arc::new(Schema::from_types_and_names(
            &[TypeId::Int],
            &["aggregateVal"],
        )),
        Some(gtype) => Arc::new(Schema::from_types_and_names(
            &[gtype, TypeId::Int],
            &["groupVal", "aggregateVal"],
        )),
    }
}

/// Iterates the materialized per-group aggregate results.
pub struct AggregateIterator {
    schema: Arc<Schema>,
    tuples: Vec<Tuple>,
    cursor: usize,
    base: Lookahead,
}

impl AggregateIterator {
    fn new(
        group_type: Option<TypeId>,
        op: AggregateOp,
        groups: &HashMap<Option<Field>, GroupState>,
    ) -> Self {
        let schema = output_schema(group_type);
        let tuples = groups
            .iter()
            .map(|(key, state)| {
                let value = match op {
                    AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => state.acc,
                    AggregateOp::Avg => state.acc / state.count,
                    AggregateOp::Count => state.count,
                };
                let fields = match key {
                    Some(group) => vec![group.clone(), Field::Int(value)],
                    None => vec![Field::Int(value)],
                };
                Tuple::new(schema.clone(), fields)
            })
            .collect();
        Self {
            schema,
            tuples,
            cursor: 0,
            base: Lookahead::new(),
        }
    }
}

impl OpIterator for AggregateIterator {
    fn open(&mut self) -> Result<(), DbError> {
        self.cursor = 0;
        self.base.set_open();
        Ok(())
    }

    fn close(&mut self) {
        self.base.set_closed();
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.close();
        self.open()
    }

    fn get_tuple_desc(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn get_children(&mut self) -> Vec<&mut dyn OpIterator> {
        Vec::new()
    }

    fn set_children(&mut self, _children: Vec<Box<dyn OpIterator>>) {}

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        if self.cursor >= self.tuples.len() {
            return Ok(None);
        }
        let tuple = self.tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(tuple))
    }

    fn base(&mut self) -> &mut Lookahead {
        &mut self.base
    }
}

enum AggregatorImpl {
    Int(IntegerAggregator),
    Str(StringAggregator),
}

/// The aggregation operator: computes a single aggregate over one column of
/// its child, optionally grouped by another column.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    afield: usize,
    gfield: Option<usize>,
    op: AggregateOp,
    afield_type: TypeId,
    group_type: Option<TypeId>,
    output_schema: Arc<Schema>,
    results: Option<AggregateIterator>,
    base: Lookahead,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        afield: usize,
        gfield: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self, DbError> {
        let child_schema = child.get_tuple_desc();
        let afield_type = child_schema.get_field_type(afield)?;
        let group_type = match gfield {
            Some(g) => Some(child_schema.get_field_type(g)?),
            None => None,
        };
        if afield_type == TypeId::String && op != AggregateOp::Count {
            return Err(DbError::IllegalArgument(format!(
                "cannot {} a string column",
                op.name()
            )));
        }
        Ok(Self {
            child,
            afield,
            gfield,
            op,
            afield_type,
            group_type,
            output_schema: output_schema(group_type),
            results: None,
            base: Lookahead::new(),
        })
    }

    pub fn get_op(&self) -> AggregateOp {
        self.op
    }

    pub fn get_group_field(&self) -> Option<usize> {
        self.gfield
    }

    pub fn get_aggregate_field(&self) -> usize {
        self.afield
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<(), DbError> {
        self.child.open()?;

        let mut aggregator = match self.afield_type {
            TypeId::Int => {
                AggregatorImpl::Int(IntegerAggregator::new(self.gfield, self.afield, self.op))
            }
            TypeId::String => {
                AggregatorImpl::Str(StringAggregator::new(self.gfield, self.afield, self.op)?)
            }
        };
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            match &mut aggregator {
                AggregatorImpl::Int(agg) => agg.merge_tuple_into_group(&tuple)?,
                AggregatorImpl::Str(agg) => agg.merge_tuple_into_group(&tuple)?,
            }
        }
        let mut results = match &aggregator {
            AggregatorImpl::Int(agg) => agg.iterator(self.group_type),
            AggregatorImpl::Str(agg) => agg.iterator(self.group_type),
        };
        results.open()?;
        self.results = Some(results);
        self.base.set_open();
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results = None;
        self.base.set_closed();
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.close();
        self.open()
    }

    fn get_tuple_desc(&self) -> Arc<Schema> {
        self.output_schema.clone()
    }

    fn get_children(&mut self) -> Vec<&mut dyn OpIterator> {
        vec![self.child.as_mut()]
    }

    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>) {
        if let Some(child) = children.into_iter().next() {
            self.child = child;
        }
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        let Some(results) = self.results.as_mut() else {
            return Ok(None);
        };
        if results.has_next()? {
            Ok(Some(results.next()?))
        } else {
            Ok(None)
        }
    }

    fn base(&mut self) -> &mut Lookahead {
        &mut self.base
    }
}
