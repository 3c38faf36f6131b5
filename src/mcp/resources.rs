//! Static resources served over MCP

use crate::mcp::types::{Resource, TextResourceContents};

/// URI of the help resource
pub const HELP_URI: &str = "graph://help";

const HELP_TEXT: &str = r#"# Microsoft Graph MCP Server Help

This server provides access to Microsoft Graph API endpoints through the
`graph_command` tool.

## Authentication

The server supports two authentication modes:

1. **Device Code Flow (default, read-only)**
   - No client secret required
   - Uses the Microsoft Graph PowerShell public client
   - The first call returns a URL and a code; sign in, then retry the call

2. **Client Secret Flow (custom app registration, read/write)**
   - Enabled when both a custom client id and tenant id are configured
   - Requires a client secret, either in the environment or as the
     `client_secret` tool parameter (cached for the rest of the session)
   - Suitable for automated operations with application permissions

## Configuration

Environment variables:
- `USE_APP_REG_CLIENTID` or `CUSTOM_CLIENT_ID`: custom app registration client ID
- `TENANTID` or `CUSTOM_TENANT_ID`: custom app registration tenant ID
- `CLIENT_SECRET`, `CUSTOM_CLIENT_SECRET` or `GRAPH_CLIENT_SECRET`: client secret
- `GRAPH_CLIENT_ID`: public client used for device code sign-in
- `GRAPH_TENANT_ID`: tenant for device code sign-in (default `common`)
- `OPERATION_TIMEOUT`: Graph request timeout in seconds (default 300)
- `LOG_LEVEL`: DEBUG, INFO, WARNING, ERROR or CRITICAL

## Examples

### Get current user info
```
graph_command(command="me")
```

### List all users
```
graph_command(command="users")
```

### Get specific user
```
graph_command(command="users/user@domain.com")
```

### Create a user (requires client secret)
```
graph_command(
    command="users",
    method="POST",
    data={
        "accountEnabled": true,
        "displayName": "John Doe",
        "mailNickname": "johndoe",
        "userPrincipalName": "johndoe@yourdomain.com",
        "passwordProfile": {
            "forceChangePasswordNextSignIn": true,
            "password": "TempPassword123!"
        }
    },
    client_secret="your-client-secret"
)
```

### Update user
```
graph_command(
    command="users/user@domain.com",
    method="PATCH",
    data={"jobTitle": "Senior Developer"}
)
```

### Delete user
```
graph_command(
    command="users/user@domain.com",
    method="DELETE"
)
```

## Common Endpoints

- `me` - Current user info
- `users` - All users
- `groups` - All groups
- `devices` - All devices
- `applications` - Applications
- `servicePrincipals` - Service principals
- `directoryRoles` - Directory roles
- `organization` - Organization info

For more endpoints, see: https://learn.microsoft.com/en-us/graph/api/overview
"#;

/// Resources advertised by `resources/list`
pub fn list() -> Vec<Resource> {
    vec![Resource {
        uri: HELP_URI.to_string(),
        name: "Microsoft Graph Help".to_string(),
        description: Some("Help and examples for using Microsoft Graph API".to_string()),
        mime_type: Some("text/plain".to_string()),
    }]
}

/// Contents of the resource at `uri`, if it exists
pub fn read(uri: &str) -> Option<TextResourceContents> {
    (uri == HELP_URI).then(|| TextResourceContents {
        uri: HELP_URI.to_string(),
        mime_type: Some("text/plain".to_string()),
        text: HELP_TEXT.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_contains_help() {
        let resources = list();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, "graph://help");
    }

    #[test]
    fn test_read_help() {
        let contents = read(HELP_URI).unwrap();
        assert!(contents.text.contains("## Authentication"));
        assert!(contents.text.contains("## Common Endpoints"));
        assert!(contents.text.contains("USE_APP_REG_CLIENTID"));
    }

    #[test]
    fn test_read_unknown() {
        assert!(read("graph://nope").is_none());
    }
}
