//! Test fixtures - reusable endpoint file constants for tests.

/// A settings document with an existing appSettings section
pub const WEB_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration>
  <appSettings>
    <add key="ModulePath" value="%windir%\system32\WindowsPowerShell\v1.0\Modules" />
    <add key="MaxConcurrentRequests" value="4" />
  </appSettings>
  <system.serviceModel>
    <serviceHostingEnvironment aspNetCompatibilityEnabled="true" />
  </system.serviceModel>
</configuration>
"#;

/// A settings document without an appSettings section
pub const WEB_CONFIG_NO_SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration>
  <system.serviceModel>
    <serviceHostingEnvironment aspNetCompatibilityEnabled="true" />
  </system.serviceModel>
</configuration>
"#;

/// A minimal service descriptor
pub const SERVICE_FILE: &str = r#"<%@ ServiceHost Service="Microsoft.Management.Odata.ManagementODataService" %>
"#;

/// A minimal schema file
pub const SCHEMA_FILE: &str = r#"class PSWS_Endpoint
{
    [Key] String Name;
};
"#;

/// A request dispatch descriptor
pub const DISPATCH_FILE: &str = r#"ResourceMappings
{
    Resource PSWS_Endpoint
    {
        CmdletImplementation { GetCmdlet = "Get-Item"; }
    }
};
"#;

/// An application bootstrap file
pub const BOOTSTRAP_FILE: &str = r#"<%@ Application Inherits="Microsoft.Management.Odata.GlobalApplication" %>
"#;

/// Placeholder binary content
pub const BINARY_FILE: &str = "MZ placeholder assembly\n";

/// An auxiliary setup script
pub const SCRIPT_FILE: &str = "param($Name)\nWrite-Verbose \"configuring $Name\"\n";
