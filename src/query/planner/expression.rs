// Expression Compilation
//
// Every expression compiles to a closure that evaluates its children and
// charges the step it performs. Derived comparisons (`<=`, `>=`, `!=`) are
// built from the primitive comparisons the value model provides.

use crate::common::types::DataType;
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::parser::ast::{
    ArithmeticOperator, ComparisonOperator, Expression, LogicalOperator, UnaryOperator,
};
use crate::query::planner::{expr_fn, ExprFn, Planner};
use crate::query::value::{ArithmeticOp, ArrayValue, ComparisonOp, UnaryOp, Value};

impl<'a> Planner<'a> {
    pub(crate) fn compile_expression(&mut self, expr: &Expression) -> InterpreterResult<ExprFn> {
        match expr {
            Expression::Literal(value) => {
                let value = value.clone();
                Ok(expr_fn(move |_| Ok(value.clone())))
            }
            Expression::Variable(name) => {
                let name = name.clone();
                Ok(expr_fn(move |ctx| ctx.get_variable(&name)))
            }
            Expression::ArrayAccess { array, index } => {
                let array_fn = self.compile_expression(array)?;
                let index_fn = self.compile_expression(index)?;
                Ok(expr_fn(move |ctx| {
                    let array = array_fn(ctx)?;
                    let index = index_fn(ctx)?;
                    ctx.spend(ctx.costs().array_access_cost)?;
                    index_array(array, index)
                }))
            }
            Expression::ArraySlice { array, from, to } => {
                let array_fn = self.compile_expression(array)?;
                let from_fn = from.as_deref().map(|e| self.compile_expression(e)).transpose()?;
                let to_fn = to.as_deref().map(|e| self.compile_expression(e)).transpose()?;
                Ok(expr_fn(move |ctx| {
                    let array = array_fn(ctx)?;
                    let from = evaluate_optional(&from_fn, ctx)?;
                    let to = evaluate_optional(&to_fn, ctx)?;
                    ctx.spend(ctx.costs().array_access_cost)?;
                    slice_array(array, from, to)
                }))
            }
            Expression::MakeArray(elements) => {
                if elements.is_empty() {
                    return Err(InterpreterError::PlanningError(
                        "array literal must have at least one element".to_string(),
                    ));
                }
                let element_fns = elements
                    .iter()
                    .map(|e| self.compile_expression(e))
                    .collect::<InterpreterResult<Vec<_>>>()?;
                Ok(expr_fn(move |ctx| {
                    let values = evaluate_all(&element_fns, ctx)?;
                    ctx.spend(ctx.costs().make_array_cost)?;
                    Value::make_array(values)
                }))
            }
            Expression::FieldAccess { record, field } => {
                let record_fn = self.compile_expression(record)?;
                let field = field.clone();
                Ok(expr_fn(move |ctx| {
                    let record = record_fn(ctx)?;
                    ctx.spend(ctx.costs().get_variable_cost)?;
                    match record {
                        Value::Record(record) => record.field(&field),
                        other => Err(InterpreterError::TypeError(format!(
                            "cannot read field {} from {}",
                            field,
                            other.data_type()
                        ))),
                    }
                }))
            }
            Expression::FunctionCall(call) => self.compile_call_expression(call),
            Expression::Cast { expr, data_type } => {
                let inner = self.compile_expression(expr)?;
                let data_type = *data_type;
                Ok(expr_fn(move |ctx| inner(ctx)?.cast(&data_type)))
            }
            Expression::Parenthesized(inner) => self.compile_expression(inner),
            Expression::Comparison { left, op, right } => {
                let left = self.compile_expression(left)?;
                let right = self.compile_expression(right)?;
                Ok(match op {
                    ComparisonOperator::Equal => compare(left, right, ComparisonOp::Equal),
                    ComparisonOperator::NotEqual => negate(compare(left, right, ComparisonOp::Equal)),
                    ComparisonOperator::LessThan => compare(left, right, ComparisonOp::LessThan),
                    ComparisonOperator::GreaterThan => compare(left, right, ComparisonOp::GreaterThan),
                    ComparisonOperator::LessThanOrEqual => compare_or_equal(left, right, ComparisonOp::LessThan),
                    ComparisonOperator::GreaterThanOrEqual => {
                        compare_or_equal(left, right, ComparisonOp::GreaterThan)
                    }
                })
            }
            Expression::Logical { left, op, right } => {
                let left_fn = self.compile_expression(left)?;
                let right_fn = self.compile_expression(right)?;
                let op = *op;
                Ok(expr_fn(move |ctx| {
                    let left = left_fn(ctx)?;
                    let right = right_fn(ctx)?;
                    ctx.spend(ctx.costs().logical_cost)?;
                    logical(left, right, op)
                }))
            }
            Expression::Arithmetic { left, op, right } => {
                let left_fn = self.compile_expression(left)?;
                let right_fn = self.compile_expression(right)?;
                let op = match op {
                    ArithmeticOperator::Add => ArithmeticOp::Add,
                    ArithmeticOperator::Subtract => ArithmeticOp::Sub,
                    ArithmeticOperator::Multiply => ArithmeticOp::Mul,
                    ArithmeticOperator::Divide => ArithmeticOp::Div,
                    ArithmeticOperator::Modulo => ArithmeticOp::Mod,
                    ArithmeticOperator::Concat => ArithmeticOp::Concat,
                };
                Ok(expr_fn(move |ctx| {
                    let left = left_fn(ctx)?;
                    let right = right_fn(ctx)?;
                    ctx.spend(ctx.costs().arithmetic_cost)?;
                    left.arithmetic(&right, op)
                }))
            }
            Expression::Unary { op, expr } => {
                let inner = self.compile_expression(expr)?;
                let op = match op {
                    UnaryOperator::Negate => UnaryOp::Neg,
                    UnaryOperator::Not => UnaryOp::Not,
                    UnaryOperator::Plus => UnaryOp::Pos,
                };
                Ok(expr_fn(move |ctx| {
                    let value = inner(ctx)?;
                    ctx.spend(ctx.costs().unary_cost)?;
                    value.unary(op)
                }))
            }
            Expression::Is {
                left,
                right,
                not,
                distinct,
            } => {
                let left_fn = self.compile_expression(left)?;
                let right_fn = self.compile_expression(right)?;
                let op = if *distinct {
                    ComparisonOp::IsDistinctFrom
                } else {
                    ComparisonOp::Is
                };
                let not = *not;
                Ok(expr_fn(move |ctx| {
                    let left = left_fn(ctx)?;
                    let right = right_fn(ctx)?;
                    ctx.spend(ctx.costs().is_cost)?;
                    let result = left.compare(&right, op)?;
                    if not {
                        result.unary(UnaryOp::Not)
                    } else {
                        Ok(result)
                    }
                }))
            }
        }
    }
}

/// Evaluate expressions left to right
pub(crate) fn evaluate_all(fns: &[ExprFn], ctx: &mut ExecutionContext) -> InterpreterResult<Vec<Value>> {
    fns.iter().map(|f| f(ctx)).collect()
}

fn evaluate_optional(f: &Option<ExprFn>, ctx: &mut ExecutionContext) -> InterpreterResult<Option<Value>> {
    f.as_ref().map(|f| f(ctx)).transpose()
}

fn compare(left: ExprFn, right: ExprFn, op: ComparisonOp) -> ExprFn {
    expr_fn(move |ctx| {
        let l = left(ctx)?;
        let r = right(ctx)?;
        ctx.spend(ctx.costs().comparison_cost)?;
        l.compare(&r, op)
    })
}

/// `<=` and `>=`: the strict comparison OR equality, operands evaluated once
fn compare_or_equal(left: ExprFn, right: ExprFn, op: ComparisonOp) -> ExprFn {
    expr_fn(move |ctx| {
        let l = left(ctx)?;
        let r = right(ctx)?;
        ctx.spend(ctx.costs().comparison_cost)?;
        let strict = l.compare(&r, op)?;
        ctx.spend(ctx.costs().comparison_cost)?;
        let equal = l.compare(&r, ComparisonOp::Equal)?;
        ctx.spend(ctx.costs().logical_cost)?;
        logical(strict, equal, LogicalOperator::Or)
    })
}

fn negate(inner: ExprFn) -> ExprFn {
    expr_fn(move |ctx| {
        let value = inner(ctx)?;
        ctx.spend(ctx.costs().unary_cost)?;
        value.unary(UnaryOp::Not)
    })
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Null(t) => t.equals_strict(&DataType::BOOL) || t.is_untyped_null(),
        _ => false,
    }
}

/// AND / OR. A NULL on the left wins over the right; a NULL on either side
/// yields NULL.
pub(crate) fn logical(left: Value, right: Value, op: LogicalOperator) -> InterpreterResult<Value> {
    if !is_boolean(&left) || !is_boolean(&right) {
        return Err(InterpreterError::TypeError(format!(
            "logical operands must be bool, got {} and {}",
            left.data_type(),
            right.data_type()
        )));
    }
    match (left, right) {
        (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(match op {
            LogicalOperator::And => l && r,
            LogicalOperator::Or => l || r,
        })),
        _ => Ok(Value::Null(DataType::BOOL)),
    }
}

/// Read one element; a NULL array or index reads as NULL
fn index_array(array: Value, index: Value) -> InterpreterResult<Value> {
    match (array, index) {
        (Value::Array(array), Value::Int(i)) => array.index(i),
        (Value::Array(array), Value::Null(t)) if t.equals_strict(&DataType::INT) || t.is_untyped_null() => {
            Ok(Value::Null(array.element_type()))
        }
        (Value::Null(t), Value::Int(_) | Value::Null(_)) => {
            Ok(Value::Null(t.element_type().unwrap_or(DataType::NULL)))
        }
        (array @ (Value::Array(_) | Value::Null(_)), index) => Err(InterpreterError::TypeError(format!(
            "array index must be int, got {} (indexing {})",
            index.data_type(),
            array.data_type()
        ))),
        (other, _) => Err(InterpreterError::TypeError(format!(
            "cannot index into {}",
            other.data_type()
        ))),
    }
}

fn slice_bound(bound: Option<Value>) -> InterpreterResult<Option<Option<i64>>> {
    match bound {
        None => Ok(Some(None)),
        Some(Value::Int(i)) => Ok(Some(Some(i))),
        Some(Value::Null(_)) => Ok(None),
        Some(other) => Err(InterpreterError::TypeError(format!(
            "array slice bound must be int, got {}",
            other.data_type()
        ))),
    }
}

/// Slice an array. A NULL array or NULL bound gives a NULL array.
fn slice_array(array: Value, from: Option<Value>, to: Option<Value>) -> InterpreterResult<Value> {
    let array: ArrayValue = match array {
        Value::Array(array) => array,
        Value::Null(t) if t.is_array || t.is_untyped_null() => return Ok(Value::Null(t)),
        other => {
            return Err(InterpreterError::TypeError(format!(
                "cannot slice {}",
                other.data_type()
            )))
        }
    };
    match (slice_bound(from)?, slice_bound(to)?) {
        (Some(from), Some(to)) => Ok(Value::Array(array.slice(from, to))),
        _ => Ok(Value::Null(array.data_type())),
    }
}
