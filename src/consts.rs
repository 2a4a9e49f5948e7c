// 配置相关
pub const CONFIG_DIR: &str = "envreport";
pub const CONFIG_FILE: &str = "config.json";
pub const ENV_PREFIX: &str = "ENVREPORT";

// 外部程序
pub const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];
pub const NVCC_PROGRAM: &str = "nvcc";
pub const NVIDIA_SMI_PROGRAM: &str = "nvidia-smi";
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

// nvcc --version 输出解析
pub const NVCC_RELEASE_MARKER: &str = "release ";
pub const NVCC_RELEASE_TERMINATOR: char = ',';

// 环境变量
pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";

// 环境信息标签
pub const KEY_OS: &str = "OS";
pub const KEY_PYTHON: &str = "Python";
pub const KEY_TRANSFORMERS: &str = "Transformers";
pub const KEY_PYTORCH: &str = "PyTorch";
pub const KEY_CUDA: &str = "CUDA";
pub const KEY_GPU: &str = "GPU";
pub const KEY_CPU: &str = "CPU";
pub const KEY_IMAGE_SIZE: &str = "Image Size";

// 占位值
pub const NOT_FOUND: &str = "Not found";
pub const NOT_AVAILABLE: &str = "Not available";
pub const NOT_SET: &str = "Not set";
pub const NOT_PROVIDED: &str = "Not provided";

// 报告段落
pub const HEADER_ENVIRONMENT: &str = "运行环境 | Environment:";
pub const HEADER_MODEL_CONFIG: &str = "Model Configuration:";
pub const HEADER_ADDITIONAL: &str = "Additional Information:";
pub const HEADER_ERROR_MESSAGE: &str = "Error Message:";
pub const FENCE_JSON: &str = "```json";
pub const FENCE: &str = "```";

// 模型配置
pub const MODEL_CONFIG_FILE: &str = "config.json";

// Python 探测脚本，输出单个 JSON 对象
pub const PYTHON_PROBE_SCRIPT: &str = r#"import json, platform
from importlib import metadata

def version(name):
    try:
        return metadata.version(name)
    except metadata.PackageNotFoundError:
        return None

print(json.dumps({
    "python": platform.python_version(),
    "transformers": version("transformers"),
    "torch": version("torch"),
}))
"#;
