//! 計算デバイスの選択
//!
//! 起動時に一度だけ、専用GPU → 内蔵GPU → CPU の順に利用可否を確認して決定します。
//! 一度決めたデバイスは実行中に変更しません。

use burn_ndarray::NdArrayDevice;
#[cfg(feature = "wgpu")]
use burn_wgpu::WgpuDevice;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::model::config::DeviceType;

/// デバイスの優先段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceTier {
    /// 専用GPU (WGPU)
    DiscreteGpu,
    /// 内蔵GPU (WGPU)
    IntegratedGpu,
    /// CPU (NdArray)
    Cpu,
}

impl DeviceTier {
    /// フォールバック順
    pub const FALLBACK_ORDER: [DeviceTier; 3] = [
        DeviceTier::DiscreteGpu,
        DeviceTier::IntegratedGpu,
        DeviceTier::Cpu,
    ];
}

impl std::fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceTier::DiscreteGpu => write!(f, "専用GPU (WGPU)"),
            DeviceTier::IntegratedGpu => write!(f, "内蔵GPU (WGPU)"),
            DeviceTier::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// 利用するデバイス段を決定
///
/// `preference` が CPU の場合は確認せずに CPU を返す。
/// CPU 段は常に利用可能として扱う。`check` の失敗は表に出さずに次の段へ進む。
pub fn select_tier<P>(preference: &DeviceType, mut check: P) -> DeviceTier
where
    P: FnMut(DeviceTier) -> Result<()>,
{
    if *preference == DeviceType::Cpu {
        return DeviceTier::Cpu;
    }

    for tier in DeviceTier::FALLBACK_ORDER {
        if tier == DeviceTier::Cpu {
            break;
        }
        match check(tier) {
            Ok(()) => return tier,
            Err(e) => tracing::debug!("{e}"),
        }
    }

    DeviceTier::Cpu
}

/// 選択済みの計算デバイス
#[derive(Debug, Clone)]
pub enum ComputeDevice {
    #[cfg(feature = "wgpu")]
    Wgpu { tier: DeviceTier, device: WgpuDevice },
    NdArray(NdArrayDevice),
}

impl ComputeDevice {
    /// 設定に従ってデバイスを選択
    pub fn select(preference: &DeviceType) -> Self {
        let tier = select_tier(preference, check_tier);
        Self::for_tier(tier)
    }

    /// 段に対応するデバイスを作成（利用可否は確認しない）
    pub fn for_tier(tier: DeviceTier) -> Self {
        #[cfg(feature = "wgpu")]
        if let Some(device) = wgpu_device(tier) {
            return ComputeDevice::Wgpu { tier, device };
        }

        let _ = tier;
        ComputeDevice::NdArray(NdArrayDevice::Cpu)
    }

    pub fn tier(&self) -> DeviceTier {
        match self {
            #[cfg(feature = "wgpu")]
            ComputeDevice::Wgpu { tier, .. } => *tier,
            ComputeDevice::NdArray(_) => DeviceTier::Cpu,
        }
    }
}

#[cfg(feature = "wgpu")]
fn wgpu_device(tier: DeviceTier) -> Option<WgpuDevice> {
    match tier {
        DeviceTier::DiscreteGpu => Some(WgpuDevice::DiscreteGpu(0)),
        DeviceTier::IntegratedGpu => Some(WgpuDevice::IntegratedGpu(0)),
        DeviceTier::Cpu => None,
    }
}

/// 実デバイスの利用可否を確認
fn check_tier(tier: DeviceTier) -> Result<()> {
    #[cfg(feature = "wgpu")]
    if let Some(device) = wgpu_device(tier) {
        return check_wgpu(tier, device);
    }

    Err(PipelineError::DeviceUnavailable { tier })
}

/// 1要素のテンソルを作れるかで判定する
///
/// アダプタが見つからない場合 WGPU はパニックするため、ここで捕捉する。
#[cfg(feature = "wgpu")]
fn check_wgpu(tier: DeviceTier, device: WgpuDevice) -> Result<()> {
    use burn::tensor::Tensor;
    use burn_wgpu::Wgpu;

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let result = std::panic::catch_unwind(move || {
        Tensor::<Wgpu, 1>::zeros([1], &device).into_data();
    });
    std::panic::set_hook(previous_hook);

    result.map_err(|_| PipelineError::DeviceUnavailable { tier })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(tiers: &'static [DeviceTier]) -> impl FnMut(DeviceTier) -> Result<()> {
        move |tier| {
            if tiers.contains(&tier) {
                Ok(())
            } else {
                Err(PipelineError::DeviceUnavailable { tier })
            }
        }
    }

    #[test]
    fn test_prefers_discrete_gpu() {
        let tier = select_tier(
            &DeviceType::Wgpu,
            available(&[DeviceTier::DiscreteGpu, DeviceTier::IntegratedGpu]),
        );
        assert_eq!(tier, DeviceTier::DiscreteGpu);
    }

    #[test]
    fn test_falls_back_to_integrated_gpu() {
        let tier = select_tier(&DeviceType::Wgpu, available(&[DeviceTier::IntegratedGpu]));
        assert_eq!(tier, DeviceTier::IntegratedGpu);
    }

    #[test]
    fn test_falls_back_to_cpu() {
        let tier = select_tier(&DeviceType::Wgpu, available(&[]));
        assert_eq!(tier, DeviceTier::Cpu);
    }

    #[test]
    fn test_cpu_preference_skips_availability_check() {
        let mut checked = Vec::new();
        let tier = select_tier(&DeviceType::Cpu, |tier| {
            checked.push(tier);
            Ok(())
        });
        assert_eq!(tier, DeviceTier::Cpu);
        assert!(checked.is_empty());
    }

    #[test]
    fn test_cpu_tier_uses_ndarray() {
        let device = ComputeDevice::for_tier(DeviceTier::Cpu);
        assert!(matches!(device, ComputeDevice::NdArray(_)));
        assert_eq!(device.tier(), DeviceTier::Cpu);
    }
}
