use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::augment::random::RandomSource;
use crate::data::{DataLoader, Dataset};
use crate::error::{Error, Result};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::network::model::Model;
use crate::optim::schedule::{adjust_learning_rate, current_learning_rate, learning_rate};
use crate::optim::sgd::Optimizer;
use crate::train::checkpoint::CheckpointManager;
use crate::train::epoch_stats::EpochStats;
use crate::train::meter::{top_k_errors, AverageMeter};
use crate::train::state::TrainingState;
use crate::train::train_config::TrainConfig;

/// Averages of one pass over a loader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassMetrics {
    pub top1: f64,
    pub top5: f64,
    pub loss: f64,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Runs epochs `config.start_epoch..config.epochs` and returns the history of
/// the whole experiment, including epochs recorded before a resume.
///
/// Each epoch: set the learning rate, train, evaluate, fold the evaluation
/// top-1/top-5 error into `state`, write the checkpoint (and the best copy
/// when the top-1 error did not get worse), then rewrite `history.json`.
///
/// Any error aborts the run before the current epoch's checkpoint is
/// written, leaving the previous epoch's checkpoint as the latest one. An
/// empty training or evaluation set is rejected before the first epoch.
pub fn train_loop<M, O, D, V>(
    state: &mut TrainingState<M, O>,
    train_loader: &mut DataLoader<D>,
    val_loader: &mut DataLoader<V>,
    config: &TrainConfig,
    checkpoints: &CheckpointManager,
    rng: &mut dyn RandomSource,
) -> Result<Vec<EpochStats>>
where
    M: Model + Serialize,
    O: Optimizer + Serialize,
    D: Dataset,
    V: Dataset,
{
    if train_loader.is_empty() {
        return Err(Error::dataset("training set is empty"));
    }
    if val_loader.is_empty() {
        return Err(Error::dataset("validation set is empty"));
    }

    let mut history = checkpoints.load_history(&config.expname)?;
    history.retain(|s| s.epoch < config.start_epoch);

    for epoch in config.start_epoch..config.epochs {
        let t_start = Instant::now();

        let lr = learning_rate(config.base_lr, epoch, config.epochs, config.lr_family);
        adjust_learning_rate(&mut state.optimizer, lr);

        // ── One full pass over the training data ───────────────────────────
        let train = train_epoch(state, train_loader, config, epoch, rng)?;

        // ── Held-out evaluation ───────────────────────────────────────────
        let val = validate(&mut state.model, val_loader, config, epoch)?;

        // ── Remember the best top-1 error and save a checkpoint ───────────
        let is_best = state.record(val.top1, val.top5);
        info!(
            "Current best accuracy (top-1 and 5 error): {} {}",
            state.best_err1, state.best_err5
        );
        state.epoch = epoch;
        checkpoints.save(state, is_best, &config.expname)?;

        history.push(EpochStats {
            epoch,
            total_epochs: config.epochs,
            lr,
            train_loss: train.loss,
            train_top1: train.top1,
            train_top5: train.top5,
            val_loss: val.loss,
            val_top1: val.top1,
            val_top5: val.top5,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        });
        checkpoints.save_history(&config.expname, &history)?;
    }

    info!(
        "Best accuracy (top-1 and 5 error): {} {}",
        state.best_err1, state.best_err5
    );
    Ok(history)
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// One epoch of augmented mini-batch training.
///
/// Error metrics are measured against the unmixed labels of each batch; the
/// loss is the composite loss of the batch's `MixedTarget`.
pub fn train_epoch<M, O, D>(
    state: &mut TrainingState<M, O>,
    loader: &mut DataLoader<D>,
    config: &TrainConfig,
    epoch: usize,
    rng: &mut dyn RandomSource,
) -> Result<PassMetrics>
where
    M: Model,
    O: Optimizer,
    D: Dataset,
{
    let mut batch_time = AverageMeter::new();
    let mut data_time = AverageMeter::new();
    let mut losses = AverageMeter::new();
    let mut top1 = AverageMeter::new();
    let mut top5 = AverageMeter::new();

    state.model.set_training(true);
    let current_lr = current_learning_rate(&state.optimizer);
    let num_batches = loader.len();

    let mut end = Instant::now();
    for (i, batch) in loader.epoch().enumerate() {
        let batch = batch?;
        data_time.update(end.elapsed().as_secs_f64(), 1);
        let n = batch.len();

        let augmented = config.augmentation.apply(batch, rng);
        let output = state.model.forward(&augmented.images);
        let (loss, grad) = augmented.target.loss_and_grad(&output);

        let errs = top_k_errors(&output, augmented.target.primary(), &[1, 5]);
        losses.update(loss as f64, n);
        top1.update(errs[0], n);
        top5.update(errs[1], n);

        // Gradient step.
        state.optimizer.zero_grad(&mut state.model.params_mut());
        state.model.backward(&grad);
        state.optimizer.step(&mut state.model.params_mut());

        batch_time.update(end.elapsed().as_secs_f64(), 1);
        end = Instant::now();

        if config.should_print(i) {
            info!(
                "Epoch: [{}/{}][{}/{}]\tLR: {:.6}\tTime {:.3} ({:.3})\tData {:.3} ({:.3})\tLoss {:.4} ({:.4})\tTop 1-err {:.4} ({:.4})\tTop 5-err {:.4} ({:.4})",
                epoch, config.epochs, i, num_batches, current_lr,
                batch_time.val, batch_time.avg, data_time.val, data_time.avg,
                losses.val, losses.avg, top1.val, top1.avg, top5.val, top5.avg
            );
        }
    }

    info!(
        "* Epoch: [{}/{}]\t Top 1-err {:.3}  Top 5-err {:.3}\t Train Loss {:.3}",
        epoch, config.epochs, top1.avg, top5.avg, losses.avg
    );

    Ok(PassMetrics { top1: top1.avg, top5: top5.avg, loss: losses.avg })
}

/// Evaluates `model` in inference mode over the whole loader.
pub fn validate<M, D>(
    model: &mut M,
    loader: &mut DataLoader<D>,
    config: &TrainConfig,
    epoch: usize,
) -> Result<PassMetrics>
where
    M: Model + ?Sized,
    D: Dataset,
{
    let mut batch_time = AverageMeter::new();
    let mut losses = AverageMeter::new();
    let mut top1 = AverageMeter::new();
    let mut top5 = AverageMeter::new();

    model.set_training(false);
    let num_batches = loader.len();

    let mut end = Instant::now();
    for (i, batch) in loader.epoch().enumerate() {
        let batch = batch?;
        let n = batch.len();

        let output = model.forward(&batch.images);
        let loss = CrossEntropyLoss::loss(&output, &batch.labels);
        let errs = top_k_errors(&output, &batch.labels, &[1, 5]);

        losses.update(loss as f64, n);
        top1.update(errs[0], n);
        top5.update(errs[1], n);

        batch_time.update(end.elapsed().as_secs_f64(), 1);
        end = Instant::now();

        if config.should_print(i) {
            info!(
                "Test (on val set): [{}/{}][{}/{}]\tTime {:.3} ({:.3})\tLoss {:.4} ({:.4})\tTop 1-err {:.4} ({:.4})\tTop 5-err {:.4} ({:.4})",
                epoch, config.epochs, i, num_batches,
                batch_time.val, batch_time.avg, losses.val, losses.avg,
                top1.val, top1.avg, top5.val, top5.avg
            );
        }
    }

    info!(
        "* Epoch: [{}/{}]\t Top 1-err {:.3}  Top 5-err {:.3}\t Test Loss {:.3}",
        epoch, config.epochs, top1.avg, top5.avg, losses.avg
    );

    Ok(PassMetrics { top1: top1.avg, top5: top5.avg, loss: losses.avg })
}
