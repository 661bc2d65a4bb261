use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferrite_mix::{
    train_loop, Args, CheckpointManager, DataLoader, Dataset, Error, Network, Result, Sgd,
    StdRandom, TrainConfig, TrainingState,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    args.validate()?;
    let kind = args.dataset_kind()?;
    let arch = args.architecture()?;
    let augmentation = args.augmentation()?;

    let checkpoints = CheckpointManager::new(&args.runs_dir);
    checkpoints.save_config(&args.expname, &args)?;

    let train_set = kind.open(&args.data_dir, args.image_size, true)?;
    let val_set = kind.open(&args.data_dir, args.image_size, false)?;
    let (c, h, w) = train_set.shape();
    let num_classes = train_set.num_classes();
    info!(train = train_set.len(), val = val_set.len(), classes = num_classes, "loaded {}", args.dataset);

    let mut train_loader = DataLoader::new(train_set, args.batch_size)?
        .with_shuffle(true)
        .with_workers(args.workers)
        .with_transform(kind.transform(true));
    let mut val_loader = DataLoader::new(val_set, args.batch_size)?
        .with_shuffle(true)
        .with_workers(args.workers)
        .with_transform(kind.transform(false));
    let mut rng = match args.seed {
        Some(seed) => {
            train_loader = train_loader.with_seed(seed);
            val_loader = val_loader.with_seed(seed.wrapping_add(1));
            StdRandom::seeded(seed)
        }
        None => StdRandom::from_entropy(),
    };

    let mut state: TrainingState<Network, Sgd> = if args.resume {
        let state: TrainingState<Network, Sgd> = checkpoints.load(&args.expname)?;
        if state.arch != arch.tag() {
            return Err(Error::config(format!(
                "checkpoint of '{}' holds a {} model, not {}",
                args.expname, state.arch, arch.tag()
            )));
        }
        info!("resuming '{}' after epoch {}", args.expname, state.epoch);
        state
    } else {
        let model = match args.seed {
            Some(seed) => {
                let mut init = StdRng::seed_from_u64(seed.wrapping_add(2));
                Network::with_rng(&arch, c * h * w, num_classes, &mut init)?
            }
            None => Network::new(&arch, c * h * w, num_classes)?,
        };
        let optimizer = Sgd::new(args.lr, args.momentum, args.weight_decay, true);
        TrainingState::new(arch.tag(), model, optimizer)
    };
    let start_epoch = if args.resume { state.epoch + 1 } else { 0 };
    info!("the number of model parameters: {}", state.model.num_parameters());
    info!("data augmentation process: {}", augmentation);

    let config = TrainConfig::new(args.epochs, args.lr, kind.lr_family(), args.expname.clone())
        .with_augmentation(augmentation)
        .with_start_epoch(start_epoch)
        .with_logging(args.print_freq, args.verbose);

    train_loop(&mut state, &mut train_loader, &mut val_loader, &config, &checkpoints, &mut rng)?;
    Ok(())
}
