//! Statement execution.

use std::rc::Rc;

use cellbook_core::ErrorKind;
use cellbook_syntax::ast::{
    AssignStmt, AugAssignStmt, BinaryOp, Expr, ForStmt, FromImportStmt, FunctionDef, IfStmt, ImportItem, Spanned,
    Statement, Target,
};

use super::Interpreter;
use super::errors::{RuntimeError, RuntimeResult};
use super::value::{Function, Value};

/// How a statement finished.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

impl Interpreter {
    pub(crate) fn exec_block(&mut self, stmts: &[Spanned<Statement>]) -> RuntimeResult<Flow> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    pub(crate) fn exec_stmt(&mut self, stmt: &Spanned<Statement>) -> RuntimeResult<Flow> {
        self.check_deadline()?;

        match &stmt.node {
            Statement::Expr(expr) => {
                self.eval(expr)?;
            }
            Statement::Assign(assign) => self.exec_assign(assign)?,
            Statement::AugAssign(aug) => self.exec_aug_assign(aug)?,
            Statement::Import(items) => self.exec_import(items)?,
            Statement::FromImport(from) => self.exec_from_import(from)?,
            Statement::FunctionDef(def) => self.exec_def(def)?,
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Statement::If(if_stmt) => return self.exec_if(if_stmt),
            Statement::For(for_stmt) => return self.exec_for(for_stmt),
            Statement::While(while_stmt) => {
                while self.eval(&while_stmt.condition)?.truthy() {
                    self.check_deadline()?;
                    match self.exec_block(&while_stmt.body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            Statement::Break => return Ok(Flow::Break),
            Statement::Continue => return Ok(Flow::Continue),
            Statement::Pass => {}
            Statement::Assert(assert) => {
                if !self.eval(&assert.condition)?.truthy() {
                    let message = match &assert.message {
                        Some(expr) => self.eval(expr)?.to_display(),
                        None => String::new(),
                    };
                    return Err(RuntimeError::new(ErrorKind::AssertionError, message));
                }
            }
            Statement::Raise(value) => return Err(self.exec_raise(value.as_ref())?),
            Statement::Del(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_assign(&mut self, assign: &AssignStmt) -> RuntimeResult<()> {
        let value = self.eval(&assign.value)?;
        for target in &assign.targets {
            self.assign_target(&target.node, value.clone())?;
        }
        Ok(())
    }

    fn exec_aug_assign(&mut self, aug: &AugAssignStmt) -> RuntimeResult<()> {
        match &aug.target.node {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.eval(&aug.value)?;
                let updated = self.augmented(aug.op, current, rhs)?;
                self.env.set(name.clone(), updated);
            }
            Target::Attribute(object, attr) => {
                let object = self.eval(object)?;
                let current = self.get_attr(&object, attr)?;
                let rhs = self.eval(&aug.value)?;
                let updated = self.augmented(aug.op, current, rhs)?;
                self.set_attr(&object, attr, updated)?;
            }
            Target::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = self.get_item(&object, &index)?;
                let rhs = self.eval(&aug.value)?;
                let updated = self.augmented(aug.op, current, rhs)?;
                self.set_item(&object, &index, updated)?;
            }
            Target::Tuple(_) => {
                return Err(RuntimeError::type_error(
                    "illegal expression for augmented assignment",
                ));
            }
        }
        Ok(())
    }

    /// `+=` on a list extends it in place; every other operator rebinds.
    fn augmented(&mut self, op: BinaryOp, current: Value, rhs: Value) -> RuntimeResult<Value> {
        if let (BinaryOp::Add, Value::List(items)) = (op, &current) {
            let extra = rhs.iterate()?;
            items.borrow_mut().extend(extra);
            return Ok(current);
        }
        self.binary_op(op, &current, &rhs)
    }

    pub(crate) fn assign_target(&mut self, target: &Target, value: Value) -> RuntimeResult<()> {
        match target {
            Target::Name(name) => {
                self.env.set(name.clone(), value);
                Ok(())
            }
            Target::Attribute(object, attr) => {
                let object = self.eval(object)?;
                self.set_attr(&object, attr, value)
            }
            Target::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.set_item(&object, &index, value)
            }
            Target::Tuple(targets) => {
                let items = value.iterate()?;
                if items.len() < targets.len() {
                    return Err(RuntimeError::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                if items.len() > targets.len() {
                    return Err(RuntimeError::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign_target(&target.node, item)?;
                }
                Ok(())
            }
        }
    }

    fn delete_target(&mut self, target: &Spanned<Target>) -> RuntimeResult<()> {
        match &target.node {
            Target::Name(name) => match self.env.remove(name) {
                Some(_) => Ok(()),
                None => Err(RuntimeError::name_error(name)),
            },
            Target::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.delete_item(&object, &index)
            }
            Target::Attribute(object, attr) => {
                let object = self.eval(object)?;
                Err(RuntimeError::no_attribute(&object.type_name(), attr))
            }
            Target::Tuple(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
                Ok(())
            }
        }
    }

    fn exec_import(&mut self, items: &[ImportItem]) -> RuntimeResult<()> {
        for item in items {
            let dotted = item.dotted();
            let module = self.import_module(&dotted)?;
            match &item.alias {
                Some(alias) => self.env.set(alias.clone(), module),
                None => {
                    // `import os.path` binds `os`
                    let root = &item.path[0];
                    let root_module = self.import_module(root)?;
                    self.env.set(root.clone(), root_module);
                }
            }
        }
        Ok(())
    }

    fn exec_from_import(&mut self, from: &FromImportStmt) -> RuntimeResult<()> {
        let module_path = from.module.join(".");
        self.import_module(&module_path)?;
        for name in &from.names {
            // Snapshot: a later patch of the module does not rebind this name
            let value = self.modules.get_attr(&module_path, &name.name).ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::ImportError,
                    format!("cannot import name '{}' from '{}'", name.name, module_path),
                )
            })?;
            let bound = name.alias.as_ref().unwrap_or(&name.name);
            self.env.set(bound.clone(), value);
        }
        Ok(())
    }

    pub(crate) fn import_module(&self, path: &str) -> RuntimeResult<Value> {
        if self.modules.contains(path) {
            Ok(Value::Module(Rc::from(path)))
        } else {
            Err(RuntimeError::new(
                ErrorKind::ImportError,
                format!("No module named '{path}'"),
            ))
        }
    }

    fn exec_def(&mut self, def: &FunctionDef) -> RuntimeResult<()> {
        let mut defaults = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let default = match &param.node.default {
                Some(expr) => Some(self.eval(expr)?),
                None => None,
            };
            defaults.push(default);
        }
        let func = Function {
            name: def.name.clone(),
            params: def.params.iter().map(|p| p.node.clone()).collect(),
            defaults,
            body: Rc::from(def.body.clone()),
        };
        self.env.set(def.name.clone(), Value::Function(Rc::new(func)));
        Ok(())
    }

    fn exec_if(&mut self, if_stmt: &IfStmt) -> RuntimeResult<Flow> {
        if self.eval(&if_stmt.condition)?.truthy() {
            return self.exec_block(&if_stmt.then_body);
        }
        for (condition, body) in &if_stmt.elif_branches {
            if self.eval(condition)?.truthy() {
                return self.exec_block(body);
            }
        }
        match &if_stmt.else_body {
            Some(body) => self.exec_block(body),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_for(&mut self, for_stmt: &ForStmt) -> RuntimeResult<Flow> {
        let iterable = self.eval(&for_stmt.iter)?;
        let mut outcome = Flow::Normal;
        self.walk(&iterable, |interp, item| {
            interp.assign_target(&for_stmt.target.node, item)?;
            match interp.exec_block(&for_stmt.body)? {
                Flow::Break => Ok(false),
                Flow::Normal | Flow::Continue => Ok(true),
                ret @ Flow::Return(_) => {
                    outcome = ret;
                    Ok(false)
                }
            }
        })?;
        Ok(outcome)
    }

    /// Build the error a `raise` statement propagates.
    fn exec_raise(&mut self, value: Option<&Spanned<Expr>>) -> RuntimeResult<RuntimeError> {
        let Some(expr) = value else {
            return Ok(RuntimeError::new(
                ErrorKind::RuntimeError,
                "No active exception to reraise",
            ));
        };
        match self.eval(expr)? {
            Value::ExceptionType(kind) => Ok(RuntimeError::new(kind, "")),
            Value::Exception(e) => Ok(RuntimeError::new(e.kind, e.message.clone())),
            other => Ok(RuntimeError::type_error(format!(
                "exceptions must derive from BaseException, not {}",
                other.type_name()
            ))),
        }
    }
}
