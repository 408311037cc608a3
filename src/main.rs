//! 図形分類パイプラインのコマンドラインツール

use clap::{Parser, Subcommand};
use shape_classifier_lib::ml_commands::{
    add_test_command, generate_command, organize_test_command, predict_command,
    preprocess_command, train_command,
};
use shape_classifier_lib::model::{AppConfig, DeviceType};
use shape_classifier_lib::tools::DEFAULT_COUNT;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shape_classifier", about = "正方形/円の画像分類器")]
struct Cli {
    /// 設定ファイル (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GPUを使わずCPUで実行する
    #[arg(long, global = true)]
    cpu: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 合成データ（正方形・円）を生成
    Generate {
        /// 出力先（既定: 設定の raw_data_dir）
        #[arg(long)]
        out: Option<PathBuf>,
        /// クラスごとの枚数
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// モデルを学習
    Train {
        /// 学習データ（既定: 設定の raw_data_dir）
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// モデルの保存先
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// 手描きテスト画像をクラスごとに整理
    OrganizeTest {
        /// 元画像のディレクトリ
        #[arg(long)]
        source: PathBuf,
        /// 整理先（既定: 設定の test_dir）
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// 画像を 64x64 グレースケールに変換
    Preprocess {
        /// 入力（既定: 設定の test_dir）
        #[arg(long)]
        input: Option<PathBuf>,
        /// 出力（既定: 設定の processed_dir）
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 評価データを推論して結果を出力
    Predict {
        /// モデルファイル
        #[arg(long)]
        model: Option<PathBuf>,
        /// 評価データ（既定: 設定の test_dir）
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// 結果CSV（省略時は results_NNN.csv を自動採番）
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// テスト画像を学習データセットへ追加
    AddTest {
        /// テスト画像（既定: 設定の test_dir）
        #[arg(long)]
        test_dir: Option<PathBuf>,
        /// 追加先
        #[arg(long, default_value = "dataset")]
        dataset_dir: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_default(&config_path);
    if cli.cpu {
        config.device_type = DeviceType::Cpu;
    }

    match cli.command {
        Commands::Generate { out, count, seed } => {
            let out = out.unwrap_or_else(|| config.paths.raw_data_dir.clone());
            generate_command(&out, count, seed)?;
        }
        Commands::Train {
            data_dir,
            model,
            epochs,
            batch_size,
            learning_rate,
            seed,
        } => {
            let training = &mut config.training;
            if let Some(epochs) = epochs {
                training.num_epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                training.batch_size = batch_size;
            }
            if let Some(learning_rate) = learning_rate {
                training.learning_rate = learning_rate;
            }
            if seed.is_some() {
                training.seed = seed;
            }

            let data_dir = data_dir.unwrap_or_else(|| config.paths.raw_data_dir.clone());
            let model = model.unwrap_or_else(|| config.paths.model_path.clone());
            config.display();
            train_command(&config, &data_dir, &model)?;
        }
        Commands::OrganizeTest { source, dest } => {
            let dest = dest.unwrap_or_else(|| config.paths.test_dir.clone());
            organize_test_command(&source, &dest)?;
        }
        Commands::Preprocess { input, output } => {
            let input = input.unwrap_or_else(|| config.paths.test_dir.clone());
            let output = output.unwrap_or_else(|| config.paths.processed_dir.clone());
            preprocess_command(&input, &output)?;
        }
        Commands::Predict {
            model,
            data_dir,
            output,
        } => {
            let model = model.unwrap_or_else(|| config.paths.model_path.clone());
            let data_dir = data_dir.unwrap_or_else(|| config.paths.test_dir.clone());
            predict_command(&config, &model, &data_dir, output.as_deref())?;
        }
        Commands::AddTest {
            test_dir,
            dataset_dir,
        } => {
            let test_dir = test_dir.unwrap_or_else(|| config.paths.test_dir.clone());
            add_test_command(&test_dir, &dataset_dir)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("エラー: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
